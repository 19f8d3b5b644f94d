//! 0x50, 0x60-0x9f: POP, PUSHn, DUPn, SWAPn

use crate::computation::Computation;
use crate::error::InstructionResult;
use crate::state::VmState;

/// POP
pub fn pop(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().pop_any(1)?;
    Ok(())
}

/// PUSH`N`; immediates cut short by the end of code are right-padded with zeros
pub fn push<const N: usize>(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let mut value = computation.code_mut().read(N).to_vec();
    value.resize(N, 0);
    computation.stack_mut().push_bytes(value)?;
    Ok(())
}

/// DUP`N`
pub fn dup<const N: usize>(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().dup(N)?;
    Ok(())
}

/// SWAP`N`
pub fn swap<const N: usize>(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    computation.stack_mut().swap(N)?;
    Ok(())
}
