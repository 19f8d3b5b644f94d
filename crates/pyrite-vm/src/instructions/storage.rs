//! 0x54-0x55: persistent storage

use crate::computation::Computation;
use crate::error::{InstructionResult, VmError};
use crate::gas::cost;
use crate::state::VmState;

/// SLOAD
pub fn sload(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    let slot = computation.stack_mut().pop1_uint()?;
    let address = computation.msg().storage_address();
    let value = state.account_db().get_storage(&address, slot)?;
    computation.stack_mut().push_uint(value)?;
    Ok(())
}

/// SSTORE, priced on the zero/nonzero transition of the slot
pub fn sstore(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    if computation.msg().is_static {
        return Err(VmError::WriteProtection.into());
    }
    let [slot, value] = computation.stack_mut().pop_uints()?;
    let address = computation.msg().storage_address();
    let current = state.account_db().get_storage(&address, slot)?;

    let gas = if current.is_zero() && !value.is_zero() {
        cost::SSTORE_SET
    } else {
        cost::SSTORE_RESET
    };
    computation.consume_gas(gas, "SSTORE")?;
    if !current.is_zero() && value.is_zero() {
        computation.refund_gas(cost::SSTORE_CLEAR_REFUND);
    }

    state.account_db_mut().set_storage(&address, slot, value)?;
    Ok(())
}
