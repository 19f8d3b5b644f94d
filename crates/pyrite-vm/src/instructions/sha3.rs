//! 0x20: SHA3

use crate::computation::Computation;
use crate::error::InstructionResult;
use crate::gas::{cost, word_gas};
use crate::state::VmState;
use pyrite_crypto::keccak256;

/// SHA3 (keccak-256 of a memory region)
pub fn sha3(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let [offset, size] = computation.stack_mut().pop_uints()?;
    computation.extend_memory(offset, size)?;
    computation.consume_gas(word_gas(cost::SHA3_WORD, size.low_u64())?, "SHA3 words")?;

    let data = computation.memory_read(offset, size)?;
    let hash = keccak256(&data);
    computation.stack_mut().push_bytes(hash.as_bytes().to_vec())?;
    Ok(())
}
