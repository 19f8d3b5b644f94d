//! 0x02 SHA256 and 0x03 RIPEMD160

use crate::computation::Computation;
use crate::error::VmError;
use crate::gas::word_gas;
use pyrite_primitives::pad32;

const SHA256_BASE: u64 = 60;
const SHA256_WORD: u64 = 12;
const RIPEMD160_BASE: u64 = 600;
const RIPEMD160_WORD: u64 = 120;

fn charge(computation: &mut Computation, base: u64, per_word: u64, reason: &str) -> Result<(), VmError> {
    let size = computation.msg().data.len() as u64;
    let gas = word_gas(per_word, size)?
        .checked_add(base)
        .ok_or(VmError::OutOfGas)?;
    computation.consume_gas(gas, reason)
}

pub(super) fn sha256(computation: &mut Computation) -> Result<(), VmError> {
    charge(computation, SHA256_BASE, SHA256_WORD, "SHA256")?;
    let hash = pyrite_crypto::sha256(&computation.msg().data);
    computation.set_output(hash.to_vec());
    Ok(())
}

/// Output is the 20-byte digest left-padded to a word
pub(super) fn ripemd160(computation: &mut Computation) -> Result<(), VmError> {
    charge(computation, RIPEMD160_BASE, RIPEMD160_WORD, "RIPEMD160")?;
    let hash = pyrite_crypto::ripemd160(&computation.msg().data);
    computation.set_output(pad32(&hash).to_vec());
    Ok(())
}
