//! Gas costs and the per-computation gas meter

use crate::error::VmError;
use crate::fork::Fork;

/// Gas costs shared by every supported fork
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp base gas
    pub const EXP: u64 = 10;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 word gas
    pub const SHA3_WORD: u64 = 6;
    /// BLOCKHASH gas
    pub const BLOCKHASH: u64 = 20;

    /// Sstore set gas (zero to nonzero)
    pub const SSTORE_SET: u64 = 20000;
    /// Sstore reset gas
    pub const SSTORE_RESET: u64 = 5000;
    /// Sstore clear refund (nonzero to zero)
    pub const SSTORE_CLEAR_REFUND: u64 = 15000;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Code deposit gas (per byte)
    pub const CODE_DEPOSIT: u64 = 200;
    /// Call value transfer gas
    pub const CALL_VALUE: u64 = 9000;
    /// Call new account gas
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Call stipend
    pub const CALL_STIPEND: u64 = 2300;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Memory quadratic cost denominator
    pub const MEMORY_QUADRATIC_DENOMINATOR: u64 = 512;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Selfdestruct new account gas
    pub const SELFDESTRUCT_NEW_ACCOUNT: u64 = 25000;
    /// Refund per account destroyed; granted by the transaction executor
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    /// Max call depth
    pub const MAX_CALL_DEPTH: usize = 1024;
    /// Max stack size
    pub const MAX_STACK_SIZE: usize = 1024;
    /// Max code size (EIP-170)
    pub const MAX_CODE_SIZE: usize = 24576;
}

/// Costs that change between forks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasSchedule {
    /// BALANCE
    pub balance: u64,
    /// SLOAD
    pub sload: u64,
    /// EXTCODESIZE and EXTCODECOPY base
    pub extcode: u64,
    /// CALL family base
    pub call: u64,
    /// SELFDESTRUCT base
    pub selfdestruct: u64,
    /// EXP per exponent byte
    pub exp_byte: u64,
}

impl GasSchedule {
    /// Schedule in force at `fork`
    pub fn for_fork(fork: Fork) -> Self {
        let mut schedule = GasSchedule {
            balance: 20,
            sload: 50,
            extcode: 20,
            call: 40,
            selfdestruct: 0,
            exp_byte: 10,
        };
        // EIP-150
        if fork >= Fork::TangerineWhistle {
            schedule.balance = 400;
            schedule.sload = 200;
            schedule.extcode = 700;
            schedule.call = 700;
            schedule.selfdestruct = 5000;
        }
        // EIP-160
        if fork >= Fork::SpuriousDragon {
            schedule.exp_byte = 50;
        }
        schedule
    }
}

/// Total cost of a memory of `size_in_bytes`, rounded up to whole words.
pub fn memory_gas_cost(size_in_bytes: u64) -> u128 {
    let words = (u128::from(size_in_bytes) + 31) / 32;
    words * u128::from(cost::MEMORY) + words * words / u128::from(cost::MEMORY_QUADRATIC_DENOMINATOR)
}

/// Per-word cost for copying `size` bytes
pub fn word_gas(per_word: u64, size: u64) -> Result<u64, VmError> {
    size.div_ceil(32).checked_mul(per_word).ok_or(VmError::OutOfGas)
}

/// All but one 64th of `gas` (EIP-150)
pub fn max_child_gas_eip150(gas: u64) -> u64 {
    gas - gas / 64
}

/// Remaining, consumed and refunded gas of one computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasMeter {
    start_gas: u64,
    gas_remaining: u64,
    gas_refunded: u64,
}

impl GasMeter {
    /// Meter starting with `start_gas`
    pub fn new(start_gas: u64) -> Self {
        Self {
            start_gas,
            gas_remaining: start_gas,
            gas_refunded: 0,
        }
    }

    /// Gas the meter started with
    pub fn start_gas(&self) -> u64 {
        self.start_gas
    }

    /// Gas still available
    pub fn gas_remaining(&self) -> u64 {
        self.gas_remaining
    }

    /// Refund accumulated so far
    pub fn gas_refunded(&self) -> u64 {
        self.gas_refunded
    }

    /// Take `amount` from the remaining gas; on failure nothing is taken.
    pub fn consume(&mut self, amount: u64, reason: &str) -> Result<(), VmError> {
        if amount > self.gas_remaining {
            tracing::trace!(amount, remaining = self.gas_remaining, reason, "out of gas");
            return Err(VmError::OutOfGas);
        }
        self.gas_remaining -= amount;
        tracing::trace!(amount, remaining = self.gas_remaining, reason, "gas consumed");
        Ok(())
    }

    /// Give back gas, e.g. what a child call left unused
    pub fn return_gas(&mut self, amount: u64) {
        self.gas_remaining = self.gas_remaining.saturating_add(amount);
        tracing::trace!(amount, remaining = self.gas_remaining, "gas returned");
    }

    /// Add to the refund counter
    pub fn refund(&mut self, amount: u64) {
        self.gas_refunded = self.gas_refunded.saturating_add(amount);
        tracing::trace!(amount, refunded = self.gas_refunded, "gas refunded");
    }

    /// Consume everything left
    pub fn burn_remaining(&mut self) {
        self.gas_remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_memory_gas_cost() {
        assert_eq!(memory_gas_cost(0), 0);
        assert_eq!(memory_gas_cost(1), 3);
        assert_eq!(memory_gas_cost(32), 3);
        assert_eq!(memory_gas_cost(33), 6);
        // 1024 words: 3 * 1024 + 1024^2 / 512
        assert_eq!(memory_gas_cost(32 * 1024), 3072 + 2048);
    }

    #[test]
    fn test_word_gas() {
        assert_eq!(word_gas(cost::COPY, 0), Ok(0));
        assert_eq!(word_gas(cost::COPY, 1), Ok(3));
        assert_eq!(word_gas(cost::SHA3_WORD, 64), Ok(12));
        assert_eq!(word_gas(u64::MAX, 64), Err(VmError::OutOfGas));
    }

    #[test]
    fn test_schedule_per_fork() {
        let frontier = GasSchedule::for_fork(Fork::Frontier);
        assert_eq!(frontier.call, 40);
        assert_eq!(frontier.exp_byte, 10);
        assert_eq!(GasSchedule::for_fork(Fork::Homestead), frontier);

        let tangerine = GasSchedule::for_fork(Fork::TangerineWhistle);
        assert_eq!(tangerine.call, 700);
        assert_eq!(tangerine.sload, 200);
        assert_eq!(tangerine.exp_byte, 10);

        assert_eq!(GasSchedule::for_fork(Fork::Byzantium).exp_byte, 50);
    }

    #[test]
    fn test_eip150_child_gas() {
        assert_eq!(max_child_gas_eip150(6400), 6300);
        assert_eq!(max_child_gas_eip150(63), 63);
    }

    #[test]
    fn test_meter_consume_and_refund() {
        let mut meter = GasMeter::new(100);
        meter.consume(40, "test").unwrap();
        assert_eq!(meter.gas_remaining(), 60);
        assert_eq!(meter.consume(61, "test"), Err(VmError::OutOfGas));
        assert_eq!(meter.gas_remaining(), 60);

        meter.refund(15000);
        assert_eq!(meter.gas_refunded(), 15000);
        meter.burn_remaining();
        assert_eq!(meter.gas_remaining(), 0);
        assert_eq!(meter.start_gas(), 100);
    }

    proptest! {
        #[test]
        fn consume_then_return_restores(start in any::<u64>(), amount in any::<u64>()) {
            let mut meter = GasMeter::new(start);
            if amount <= start {
                meter.consume(amount, "prop").unwrap();
                meter.return_gas(amount);
                prop_assert_eq!(meter.gas_remaining(), start);
            } else {
                prop_assert_eq!(meter.consume(amount, "prop"), Err(VmError::OutOfGas));
                prop_assert_eq!(meter.gas_remaining(), start);
            }
        }
    }
}
