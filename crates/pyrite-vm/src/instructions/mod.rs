//! Opcode bodies, grouped the way the Yellow Paper groups them

pub mod arithmetic;
pub mod block;
pub mod comparison;
pub mod environment;
pub mod flow;
pub mod logging;
pub mod memory;
pub mod sha3;
pub mod stack;
pub mod storage;
pub mod system;

use pyrite_primitives::U256;

/// `value` as a usize, clamped at `usize::MAX`
pub(crate) fn saturating_usize(value: U256) -> usize {
    if value > U256::from(usize::MAX) {
        usize::MAX
    } else {
        value.as_usize()
    }
}

/// `size` bytes of `data` from `start`, zero-filled past the end
pub(crate) fn padded_slice(data: &[u8], start: U256, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    let start = saturating_usize(start);
    if start < data.len() {
        let available = (data.len() - start).min(size);
        out[..available].copy_from_slice(&data[start..start + available]);
    }
    out
}
