//! STOP, JUMP family and machine-state reads

use crate::computation::Computation;
use crate::error::{InstructionResult, Interrupt, VmError};
use crate::opcode::Opcode;
use crate::state::VmState;
use pyrite_primitives::U256;

/// STOP
pub fn stop(_computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    Err(Interrupt::Halt)
}

fn jump_to(computation: &mut Computation, destination: U256) -> InstructionResult {
    if destination >= U256::from(computation.code().len()) {
        return Err(VmError::InvalidJumpDestination.into());
    }
    let destination = destination.as_usize();
    let code = computation.code_mut();
    code.set_pc(destination);
    if code.peek() != Opcode::JUMPDEST as u8 {
        return Err(VmError::InvalidJumpDestination.into());
    }
    if !code.is_valid_opcode(destination) {
        return Err(VmError::InvalidInstruction.into());
    }
    Ok(())
}

/// JUMP
pub fn jump(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let destination = computation.stack_mut().pop1_uint()?;
    jump_to(computation, destination)
}

/// JUMPI
pub fn jumpi(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let [destination, condition] = computation.stack_mut().pop_uints()?;
    if condition.is_zero() {
        return Ok(());
    }
    jump_to(computation, destination)
}

/// PC of this instruction
pub fn pc(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let pc = computation.code().pc().saturating_sub(1);
    computation.stack_mut().push_uint(U256::from(pc))?;
    Ok(())
}

/// GAS, after this instruction's own cost
pub fn gas(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let remaining = computation.get_gas_remaining();
    computation.stack_mut().push_uint(U256::from(remaining))?;
    Ok(())
}

/// JUMPDEST
pub fn jumpdest(_computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::error::VmError;
    use crate::instructions::test_utils::{run_code, top};
    use pyrite_primitives::U256;

    #[test]
    fn test_jump_over_invalid() {
        // PUSH1 4, JUMP, INVALID, JUMPDEST, PUSH1 1
        let computation = run_code(&[0x60, 0x04, 0x56, 0xfe, 0x5b, 0x60, 0x01], 100);
        assert!(computation.is_success());
        assert_eq!(top(&computation), U256::one());
    }

    #[test]
    fn test_jump_to_non_jumpdest() {
        let computation = run_code(&[0x60, 0x03, 0x56, 0x00], 100);
        assert_eq!(computation.error(), Some(&VmError::InvalidJumpDestination));
    }

    #[test]
    fn test_jump_past_end() {
        let computation = run_code(&[0x60, 0xff, 0x56], 100);
        assert_eq!(computation.error(), Some(&VmError::InvalidJumpDestination));
    }

    #[test]
    fn test_jump_into_push_data() {
        // PUSH1 4, JUMP, PUSH1 0x5b: offset 4 is a 0x5b byte inside PUSH data
        let computation = run_code(&[0x60, 0x04, 0x56, 0x60, 0x5b], 100);
        assert_eq!(computation.error(), Some(&VmError::InvalidInstruction));
    }

    #[test]
    fn test_jumpi() {
        // PUSH1 0 (cond), PUSH1 8, JUMPI, PUSH1 1, STOP, JUMPDEST
        let not_taken = run_code(&[0x60, 0x00, 0x60, 0x08, 0x57, 0x60, 0x01, 0x00, 0x5b], 100);
        assert_eq!(top(&not_taken), U256::one());

        let taken = run_code(&[0x60, 0x01, 0x60, 0x08, 0x57, 0x60, 0x01, 0x00, 0x5b], 100);
        assert!(taken.is_success());
        assert!(taken.stack().is_empty());
    }

    #[test]
    fn test_pc_and_gas() {
        // JUMPDEST, PC
        assert_eq!(top(&run_code(&[0x5b, 0x58], 100)), U256::one());
        // GAS
        assert_eq!(top(&run_code(&[0x5a], 100)), U256::from(98));
    }

    #[test]
    fn test_counting_loop() {
        // counter = 0; loop { counter += 1; if counter < 5 continue }
        let code = [
            0x60, 0x00, // PUSH1 0
            0x5b, // JUMPDEST
            0x60, 0x01, // PUSH1 1
            0x01, // ADD
            0x80, // DUP1
            0x60, 0x05, // PUSH1 5
            0x11, // GT (5 > counter)
            0x60, 0x02, // PUSH1 2
            0x57, // JUMPI
        ];
        let computation = run_code(&code, 10_000);
        assert!(computation.is_success());
        assert_eq!(computation.stack().to_uints(), vec![U256::from(5)]);
    }
}
