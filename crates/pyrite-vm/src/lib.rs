//! # pyrite-vm
//!
//! Ethereum virtual machine core, Frontier through Byzantium.
//!
//! This crate provides:
//! - Machine parts: [`Stack`], [`Memory`], [`CodeStream`], [`GasMeter`]
//! - [`Computation`]: one message frame with its child frames, logs and deletions
//! - Per-fork [`OpcodeTable`] dispatch and [`PrecompileSet`]
//! - [`VmState`]: block context plus the journaled account database a transaction runs against
//!
//! Running a message:
//!
//! ```ignore
//! let mut state = VmState::with_fork(&mut account_db, block, Fork::Byzantium);
//! let computation = Computation::apply_message(&mut state, msg, tx_context)?;
//! if computation.is_success() { /* ... */ }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod code_stream;
mod computation;
mod error;
mod fork;
mod gas;
pub mod instructions;
mod memory;
mod message;
mod opcode;
pub mod precompiles;
mod stack;
mod state;
mod table;

pub use code_stream::CodeStream;
pub use computation::{Computation, LogEntry};
pub use error::{Error, InstructionResult, Interrupt, VmError, VmResult};
pub use fork::{ChainConfig, Fork, ForkSpec};
pub use gas::{cost, memory_gas_cost, GasMeter, GasSchedule};
pub use instructions::system::contract_address;
pub use memory::Memory;
pub use message::{BlockContext, Message, TransactionContext, CREATE_CONTRACT_ADDRESS};
pub use opcode::Opcode;
pub use precompiles::{PrecompileFn, PrecompileSet};
pub use stack::{Stack, StackItem};
pub use state::VmState;
pub use table::{Handler, OpcodeEntry, OpcodeTable};
