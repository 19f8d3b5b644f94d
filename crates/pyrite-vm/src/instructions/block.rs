//! 0x40s: block information

use crate::computation::Computation;
use crate::error::InstructionResult;
use crate::state::VmState;
use pyrite_primitives::U256;

/// BLOCKHASH; zero outside the last 256 ancestors
pub fn blockhash(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    let block_number = computation.stack_mut().pop1_uint()?;
    let hash = state.block().ancestor_hash(block_number);
    computation.stack_mut().push_bytes(hash.as_bytes().to_vec())?;
    Ok(())
}

/// COINBASE
pub fn coinbase(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().push_address(&state.block().coinbase)?;
    Ok(())
}

/// TIMESTAMP
pub fn timestamp(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().push_uint(U256::from(state.block().timestamp))?;
    Ok(())
}

/// NUMBER
pub fn number(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().push_uint(U256::from(state.block().number))?;
    Ok(())
}

/// DIFFICULTY
pub fn difficulty(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().push_uint(state.block().difficulty)?;
    Ok(())
}

/// GASLIMIT
pub fn gaslimit(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().push_uint(U256::from(state.block().gas_limit))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::instructions::test_utils::{run_code, top};
    use pyrite_primitives::U256;

    #[test]
    fn test_block_fields() {
        assert_eq!(top(&run_code(&[0x43], 100)), U256::from(10));
        assert_eq!(top(&run_code(&[0x42], 100)), U256::from(1_500_000_000u64));
        assert_eq!(top(&run_code(&[0x45], 100)), U256::from(8_000_000));
        assert_eq!(top(&run_code(&[0x44], 100)), U256::zero());
        assert_eq!(top(&run_code(&[0x41], 100)), U256::zero());
    }

    #[test]
    fn test_blockhash_of_current_block_is_zero() {
        // PUSH1 10, BLOCKHASH
        let computation = run_code(&[0x60, 0x0a, 0x40], 100);
        assert_eq!(top(&computation), U256::zero());
        assert_eq!(computation.get_gas_used(), 23);
    }
}
