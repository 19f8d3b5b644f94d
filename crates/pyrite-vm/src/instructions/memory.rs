//! 0x51-0x53, 0x59: memory access

use crate::computation::Computation;
use crate::error::InstructionResult;
use crate::state::VmState;
use pyrite_primitives::{u256_to_be_bytes, U256};

/// MLOAD
pub fn mload(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let offset = computation.stack_mut().pop1_uint()?;
    computation.extend_memory(offset, U256::from(32))?;
    let word = computation.memory_read(offset, U256::from(32))?;
    computation.stack_mut().push_bytes(word)?;
    Ok(())
}

/// MSTORE
pub fn mstore(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let offset = stack.pop1_uint()?;
    let value = stack.pop1_uint()?;
    computation.extend_memory(offset, U256::from(32))?;
    computation.memory_write(offset, &u256_to_be_bytes(&value))?;
    Ok(())
}

/// MSTORE8; stores the low byte
pub fn mstore8(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let offset = stack.pop1_uint()?;
    let value = stack.pop1_uint()?;
    computation.extend_memory(offset, U256::one())?;
    computation.memory_write(offset, &[value.byte(0)])?;
    Ok(())
}

/// MSIZE
pub fn msize(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let size = computation.memory().len();
    computation.stack_mut().push_uint(U256::from(size))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::VmError;
    use crate::instructions::test_utils::{run_code, top};
    use pyrite_primitives::U256;

    #[test]
    fn test_mstore_mload() {
        // PUSH1 0x42, PUSH1 0, MSTORE, PUSH1 0, MLOAD
        let computation = run_code(&[0x60, 0x42, 0x60, 0x00, 0x52, 0x60, 0x00, 0x51], 1000);
        assert_eq!(top(&computation), U256::from(0x42));
        assert_eq!(computation.get_gas_used(), 3 + 3 + 3 + 3 + 3 + 3);
    }

    #[test]
    fn test_mstore8_and_msize() {
        // PUSH1 0xff, PUSH1 33, MSTORE8, MSIZE
        let computation = run_code(&[0x60, 0xff, 0x60, 0x21, 0x53, 0x59], 1000);
        assert_eq!(top(&computation), U256::from(64));
        assert_eq!(computation.memory().as_slice()[33], 0xff);
    }

    #[test]
    fn test_huge_offset_runs_out_of_gas() {
        // PUSH32 2^255, MLOAD
        let mut code = vec![0x7f, 0x80];
        code.extend([0x00; 31]);
        code.push(0x51);
        let computation = run_code(&code, 1_000_000);
        assert_eq!(computation.error(), Some(&VmError::OutOfGas));
        assert_eq!(computation.get_gas_used(), 1_000_000);
    }

    #[test]
    fn test_quadratic_memory_cost() {
        // PUSH2 0x03e0 (992), MLOAD: 32 words -> 32 * 3 + 32 * 32 / 512 = 98
        let computation = run_code(&[0x61, 0x03, 0xe0, 0x51], 1000);
        assert!(computation.is_success());
        assert_eq!(computation.get_gas_used(), 3 + 3 + 98);
    }
}
