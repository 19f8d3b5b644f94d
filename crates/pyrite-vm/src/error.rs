//! VM error types

use pyrite_db::DbError;
use pyrite_primitives::ValidationError;
use thiserror::Error;

/// Runtime failures reachable by untrusted bytecode.
///
/// These never escape the computation that raised them; they become its terminal error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Pop or dup/swap past the bottom of the stack
    #[error("insufficient stack items")]
    InsufficientStack,

    /// Push beyond 1024 items
    #[error("stack full (max 1024)")]
    FullStack,

    /// Jump target is not a JUMPDEST
    #[error("invalid jump destination")]
    InvalidJumpDestination,

    /// Jump target JUMPDEST sits inside PUSH data
    #[error("jump into push data")]
    InvalidInstruction,

    /// Undefined opcode for the active fork
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Sender cannot cover the transferred value
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Message depth above 1024
    #[error("stack depth limit reached")]
    StackDepthLimit,

    /// Deliberate REVERT; keeps gas and output
    #[error("execution reverted")]
    Revert,

    /// State modification inside a static call
    #[error("state modification in static context")]
    WriteProtection,

    /// RETURNDATACOPY past the end of the return buffer
    #[error("return data out of bounds")]
    OutOfBoundsRead,

    /// Deployed code above 24576 bytes
    #[error("contract code size exceeds 24576 bytes")]
    ContractCodeSizeLimit,

    /// Precompile rejected its input
    #[error("precompile failure: {0}")]
    PrecompileFailure(&'static str),
}

impl VmError {
    /// Whether the failing computation forfeits its remaining gas
    pub fn burns_gas(&self) -> bool {
        !matches!(self, VmError::Revert)
    }

    /// Whether the failing computation's output is hidden from its caller
    pub fn erases_return_data(&self) -> bool {
        !matches!(self, VmError::Revert)
    }
}

/// Hard failures that abort the whole call tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller or implementation bug
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// State backend failure
    #[error("state error: {0}")]
    Db(#[from] DbError),
}

/// Result type for the outward VM API
pub type VmResult<T> = Result<T, Error>;

/// Why an instruction stopped the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// Clean stop (STOP, RETURN, SELFDESTRUCT); REVERT uses `Vm(Revert)`
    Halt,
    /// Captured as the computation's terminal error
    Vm(VmError),
    /// Propagated to the caller of `apply_computation`
    Fatal(Error),
}

impl From<VmError> for Interrupt {
    fn from(err: VmError) -> Self {
        Interrupt::Vm(err)
    }
}

impl From<Error> for Interrupt {
    fn from(err: Error) -> Self {
        Interrupt::Fatal(err)
    }
}

impl From<ValidationError> for Interrupt {
    fn from(err: ValidationError) -> Self {
        Interrupt::Fatal(Error::Validation(err))
    }
}

impl From<DbError> for Interrupt {
    fn from(err: DbError) -> Self {
        Interrupt::Fatal(Error::Db(err))
    }
}

/// Result type of instruction handlers
pub type InstructionResult = Result<(), Interrupt>;
