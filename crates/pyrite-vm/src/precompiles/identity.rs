//! 0x04 IDENTITY

use crate::computation::Computation;
use crate::error::VmError;
use crate::gas::word_gas;

const IDENTITY_BASE: u64 = 15;
const IDENTITY_WORD: u64 = 3;

pub(super) fn identity(computation: &mut Computation) -> Result<(), VmError> {
    let data = computation.msg().data.clone();
    let gas = word_gas(IDENTITY_WORD, data.len() as u64)?
        .checked_add(IDENTITY_BASE)
        .ok_or(VmError::OutOfGas)?;
    computation.consume_gas(gas, "IDENTITY")?;
    computation.set_output(data);
    Ok(())
}
