//! 0xa0-0xa4: LOG0..LOG4

use crate::computation::Computation;
use crate::error::{InstructionResult, VmError};
use crate::gas::cost;
use crate::state::VmState;
use pyrite_primitives::{H256, U256};

/// LOG`N`: charges data and topics before touching memory
pub fn log<const N: usize>(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    if computation.msg().is_static {
        return Err(VmError::WriteProtection.into());
    }
    let [offset, size] = computation.stack_mut().pop_uints()?;
    let topics = computation
        .stack_mut()
        .pop_uints::<N>()?
        .into_iter()
        .map(H256::from)
        .collect::<Vec<_>>();

    if size > U256::from(u64::MAX) {
        return Err(VmError::OutOfGas.into());
    }
    let gas = size
        .low_u64()
        .checked_mul(cost::LOG_DATA)
        .and_then(|data_gas| data_gas.checked_add(cost::LOG_TOPIC * N as u64))
        .ok_or(VmError::OutOfGas)?;
    computation.consume_gas(gas, "LOG data and topics")?;
    computation.extend_memory(offset, size)?;

    let data = computation.memory_read(offset, size)?;
    let address = computation.msg().storage_address();
    computation.add_log_entry(address, topics, data);
    Ok(())
}
