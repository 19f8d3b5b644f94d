//! 0x30s: environmental information

use super::padded_slice;
use crate::computation::Computation;
use crate::error::{InstructionResult, Interrupt, VmError};
use crate::gas::{cost, word_gas};
use crate::state::VmState;
use pyrite_primitives::U256;

/// Expand memory for a copy and charge the per-word fee; returns the copy length
fn charge_copy(computation: &mut Computation, mem_start: U256, size: U256) -> Result<usize, Interrupt> {
    computation.extend_memory(mem_start, size)?;
    computation.consume_gas(word_gas(cost::COPY, size.low_u64())?, "copy words")?;
    // A nonzero size fits once memory covers it
    Ok(if size.is_zero() { 0 } else { size.as_usize() })
}

/// ADDRESS
pub fn address(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let address = computation.msg().storage_address();
    computation.stack_mut().push_address(&address)?;
    Ok(())
}

/// BALANCE
pub fn balance(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    let address = computation.stack_mut().pop1_address()?;
    let balance = state.account_db().get_balance(&address)?;
    computation.stack_mut().push_uint(balance)?;
    Ok(())
}

/// ORIGIN
pub fn origin(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let origin = computation.tx_context().origin();
    computation.stack_mut().push_address(&origin)?;
    Ok(())
}

/// CALLER
pub fn caller(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let sender = computation.msg().sender;
    computation.stack_mut().push_address(&sender)?;
    Ok(())
}

/// CALLVALUE
pub fn callvalue(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let value = computation.msg().value;
    computation.stack_mut().push_uint(value)?;
    Ok(())
}

/// CALLDATALOAD; reads past the end are zero
pub fn calldataload(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let start = computation.stack_mut().pop1_uint()?;
    let word = padded_slice(&computation.msg().data, start, 32);
    computation.stack_mut().push_bytes(word)?;
    Ok(())
}

/// CALLDATASIZE
pub fn calldatasize(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let size = computation.msg().data.len();
    computation.stack_mut().push_uint(U256::from(size))?;
    Ok(())
}

/// CALLDATACOPY
pub fn calldatacopy(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let [mem_start, data_start, size] = computation.stack_mut().pop_uints()?;
    let size = charge_copy(computation, mem_start, size)?;
    let value = padded_slice(&computation.msg().data, data_start, size);
    computation.memory_write(mem_start, &value)?;
    Ok(())
}

/// CODESIZE
pub fn codesize(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let size = computation.code().len();
    computation.stack_mut().push_uint(U256::from(size))?;
    Ok(())
}

/// CODECOPY
pub fn codecopy(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let [mem_start, code_start, size] = computation.stack_mut().pop_uints()?;
    let size = charge_copy(computation, mem_start, size)?;
    let value = padded_slice(computation.code().as_slice(), code_start, size);
    computation.memory_write(mem_start, &value)?;
    Ok(())
}

/// GASPRICE
pub fn gasprice(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let gas_price = computation.tx_context().gas_price();
    computation.stack_mut().push_uint(gas_price)?;
    Ok(())
}

/// EXTCODESIZE
pub fn extcodesize(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    let address = computation.stack_mut().pop1_address()?;
    let code = state.account_db().get_code(&address)?;
    computation.stack_mut().push_uint(U256::from(code.len()))?;
    Ok(())
}

/// EXTCODECOPY
pub fn extcodecopy(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    let address = computation.stack_mut().pop1_address()?;
    let [mem_start, code_start, size] = computation.stack_mut().pop_uints()?;
    let size = charge_copy(computation, mem_start, size)?;
    let code = state.account_db().get_code(&address)?;
    let value = padded_slice(&code, code_start, size);
    computation.memory_write(mem_start, &value)?;
    Ok(())
}

/// RETURNDATASIZE
pub fn returndatasize(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let size = computation.return_data().len();
    computation.stack_mut().push_uint(U256::from(size))?;
    Ok(())
}

/// RETURNDATACOPY; reading past the buffer is an error rather than zero-filled
pub fn returndatacopy(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let [mem_start, data_start, size] = computation.stack_mut().pop_uints()?;
    let in_bounds = data_start
        .checked_add(size)
        .is_some_and(|end| end <= U256::from(computation.return_data().len()));
    if !in_bounds {
        return Err(VmError::OutOfBoundsRead.into());
    }
    let size = charge_copy(computation, mem_start, size)?;
    let value = padded_slice(computation.return_data(), data_start, size);
    computation.memory_write(mem_start, &value)?;
    Ok(())
}
