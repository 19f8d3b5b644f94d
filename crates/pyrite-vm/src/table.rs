//! Per-fork opcode dispatch tables

use crate::computation::Computation;
use crate::error::{InstructionResult, VmError};
use crate::fork::Fork;
use crate::gas::{cost, GasSchedule};
use crate::instructions::{
    arithmetic, block, comparison, environment, flow, logging, memory, sha3, stack, storage, system,
};
use crate::opcode::Opcode;
use crate::state::VmState;

/// Opcode body; the base gas has already been charged when it runs
pub type Handler = fn(&mut Computation, &mut VmState<'_>) -> InstructionResult;

/// One slot of a dispatch table
#[derive(Clone, Copy)]
pub enum OpcodeEntry {
    /// Undefined in this fork
    Invalid,
    /// Defined opcode
    Defined {
        /// Base gas, charged before the handler runs
        gas: u64,
        /// Body
        handler: Handler,
    },
}

impl std::fmt::Debug for OpcodeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpcodeEntry::Invalid => f.write_str("Invalid"),
            OpcodeEntry::Defined { gas, .. } => f.debug_struct("Defined").field("gas", gas).finish(),
        }
    }
}

// Registers a const-generic handler family: `$first + n` for each listed n
macro_rules! register_family {
    ($table:ident, $first:expr, $gas:expr, $module:ident::$func:ident, [$($n:literal),* $(,)?]) => {
        $(
            $table.entries[$first as usize + $n] = OpcodeEntry::Defined {
                gas: $gas,
                handler: $module::$func::<$n>,
            };
        )*
    };
}

/// Dispatch table indexed by opcode byte
pub struct OpcodeTable {
    entries: [OpcodeEntry; 256],
}

impl OpcodeTable {
    /// Table for `fork`, with fork-dependent base costs taken from `schedule`
    pub fn for_fork(fork: Fork, schedule: &GasSchedule) -> Self {
        let mut table = Self {
            entries: [OpcodeEntry::Invalid; 256],
        };
        table.register_frontier(schedule);

        // EIP-7
        if fork >= Fork::Homestead {
            table.set(Opcode::DELEGATECALL, schedule.call, system::delegatecall);
        }
        // EIP-140, EIP-211, EIP-214
        if fork >= Fork::Byzantium {
            table.set(Opcode::REVERT, cost::ZERO, system::revert);
            table.set(Opcode::RETURNDATASIZE, cost::BASE, environment::returndatasize);
            table.set(Opcode::RETURNDATACOPY, cost::VERYLOW, environment::returndatacopy);
            table.set(Opcode::STATICCALL, schedule.call, system::staticcall);
        }
        table
    }

    fn set(&mut self, opcode: Opcode, gas: u64, handler: Handler) {
        self.entries[opcode as usize] = OpcodeEntry::Defined { gas, handler };
    }

    fn register_frontier(&mut self, schedule: &GasSchedule) {
        use Opcode::*;

        self.set(STOP, cost::ZERO, flow::stop);

        self.set(ADD, cost::VERYLOW, arithmetic::add);
        self.set(MUL, cost::LOW, arithmetic::mul);
        self.set(SUB, cost::VERYLOW, arithmetic::sub);
        self.set(DIV, cost::LOW, arithmetic::div);
        self.set(SDIV, cost::LOW, arithmetic::sdiv);
        self.set(MOD, cost::LOW, arithmetic::modulo);
        self.set(SMOD, cost::LOW, arithmetic::smod);
        self.set(ADDMOD, cost::MID, arithmetic::addmod);
        self.set(MULMOD, cost::MID, arithmetic::mulmod);
        self.set(EXP, cost::EXP, arithmetic::exp);
        self.set(SIGNEXTEND, cost::LOW, arithmetic::signextend);

        self.set(LT, cost::VERYLOW, comparison::lt);
        self.set(GT, cost::VERYLOW, comparison::gt);
        self.set(SLT, cost::VERYLOW, comparison::slt);
        self.set(SGT, cost::VERYLOW, comparison::sgt);
        self.set(EQ, cost::VERYLOW, comparison::eq);
        self.set(ISZERO, cost::VERYLOW, comparison::iszero);
        self.set(AND, cost::VERYLOW, comparison::and);
        self.set(OR, cost::VERYLOW, comparison::or);
        self.set(XOR, cost::VERYLOW, comparison::xor);
        self.set(NOT, cost::VERYLOW, comparison::not);
        self.set(BYTE, cost::VERYLOW, comparison::byte);

        self.set(SHA3, cost::SHA3, sha3::sha3);

        self.set(ADDRESS, cost::BASE, environment::address);
        self.set(BALANCE, schedule.balance, environment::balance);
        self.set(ORIGIN, cost::BASE, environment::origin);
        self.set(CALLER, cost::BASE, environment::caller);
        self.set(CALLVALUE, cost::BASE, environment::callvalue);
        self.set(CALLDATALOAD, cost::VERYLOW, environment::calldataload);
        self.set(CALLDATASIZE, cost::BASE, environment::calldatasize);
        self.set(CALLDATACOPY, cost::VERYLOW, environment::calldatacopy);
        self.set(CODESIZE, cost::BASE, environment::codesize);
        self.set(CODECOPY, cost::VERYLOW, environment::codecopy);
        self.set(GASPRICE, cost::BASE, environment::gasprice);
        self.set(EXTCODESIZE, schedule.extcode, environment::extcodesize);
        self.set(EXTCODECOPY, schedule.extcode, environment::extcodecopy);

        self.set(BLOCKHASH, cost::BLOCKHASH, block::blockhash);
        self.set(COINBASE, cost::BASE, block::coinbase);
        self.set(TIMESTAMP, cost::BASE, block::timestamp);
        self.set(NUMBER, cost::BASE, block::number);
        self.set(DIFFICULTY, cost::BASE, block::difficulty);
        self.set(GASLIMIT, cost::BASE, block::gaslimit);

        self.set(POP, cost::BASE, stack::pop);
        self.set(MLOAD, cost::VERYLOW, memory::mload);
        self.set(MSTORE, cost::VERYLOW, memory::mstore);
        self.set(MSTORE8, cost::VERYLOW, memory::mstore8);
        self.set(SLOAD, schedule.sload, storage::sload);
        self.set(SSTORE, cost::ZERO, storage::sstore);
        self.set(JUMP, cost::MID, flow::jump);
        self.set(JUMPI, cost::HIGH, flow::jumpi);
        self.set(PC, cost::BASE, flow::pc);
        self.set(MSIZE, cost::BASE, memory::msize);
        self.set(GAS, cost::BASE, flow::gas);
        self.set(JUMPDEST, cost::JUMPDEST, flow::jumpdest);

        let table = self;
        register_family!(table, 0x5f, cost::VERYLOW, stack::push, [
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
            17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32,
        ]);
        register_family!(table, 0x7f, cost::VERYLOW, stack::dup, [
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
        ]);
        register_family!(table, 0x8f, cost::VERYLOW, stack::swap, [
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
        ]);
        register_family!(table, 0xa0, cost::LOG, logging::log, [0, 1, 2, 3, 4]);

        table.set(CREATE, cost::CREATE, system::create);
        table.set(CALL, schedule.call, system::call);
        table.set(CALLCODE, schedule.call, system::callcode);
        table.set(RETURN, cost::ZERO, system::return_op);
        table.set(SELFDESTRUCT, schedule.selfdestruct, system::selfdestruct);
    }

    /// Entry for `opcode`
    pub fn get(&self, opcode: u8) -> OpcodeEntry {
        self.entries[opcode as usize]
    }

    /// Whether `opcode` is defined in this table
    pub fn is_defined(&self, opcode: u8) -> bool {
        matches!(self.entries[opcode as usize], OpcodeEntry::Defined { .. })
    }

    /// Charge the base cost of `opcode` and run it
    pub(crate) fn execute(
        &self,
        opcode: u8,
        computation: &mut Computation,
        state: &mut VmState<'_>,
    ) -> InstructionResult {
        match self.entries[opcode as usize] {
            OpcodeEntry::Invalid => Err(VmError::InvalidOpcode(opcode).into()),
            OpcodeEntry::Defined { gas, handler } => {
                computation.consume_gas(gas, "opcode")?;
                handler(computation, state)
            }
        }
    }
}
