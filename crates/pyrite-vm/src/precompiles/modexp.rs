//! 0x05 MODEXP (EIP-198)
//!
//! Input is three 32-byte lengths followed by `base ‖ exponent ‖ modulus`, all big-endian and
//! zero-extended on the right. Output is `base ^ exponent % modulus` left-padded to the modulus
//! length.

use crate::computation::Computation;
use crate::error::VmError;
use crate::instructions::padded_slice;
use pyrite_primitives::U256;

const GAS_QUAD_DIVISOR: u128 = 20;

fn read_length(data: &[u8], offset: u64) -> U256 {
    U256::from_big_endian(&padded_slice(data, U256::from(offset), 32))
}

fn clamp_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.as_u64()
    }
}

fn mult_complexity(x: u128) -> u128 {
    if x <= 64 {
        x.saturating_mul(x)
    } else if x <= 1024 {
        (x.saturating_mul(x) / 4)
            .saturating_add(96 * x)
            .saturating_sub(3072)
    } else {
        (x.saturating_mul(x) / 16)
            .saturating_add(x.saturating_mul(480))
            .saturating_sub(199_680)
    }
}

/// Bit length of the exponent, less one, with 8 bits per byte beyond the first word
fn adjusted_exponent_length(exp_len: u64, exp_head: U256) -> u128 {
    let head_bits = if exp_head.is_zero() {
        0
    } else {
        exp_head.bits() as u128 - 1
    };
    if exp_len <= 32 {
        head_bits
    } else {
        u128::from(exp_len - 32)
            .saturating_mul(8)
            .saturating_add(head_bits)
    }
}

/// Gas for the given lengths and the first word of the exponent
pub(crate) fn modexp_gas(base_len: u64, exp_len: u64, mod_len: u64, exp_head: U256) -> u128 {
    let complexity = mult_complexity(u128::from(base_len.max(mod_len)));
    let adjusted = adjusted_exponent_length(exp_len, exp_head).max(1);
    complexity.saturating_mul(adjusted) / GAS_QUAD_DIVISOR
}

pub(super) fn modexp(computation: &mut Computation) -> Result<(), VmError> {
    let data = computation.msg().data.clone();
    let base_len = clamp_u64(read_length(&data, 0));
    let exp_len = clamp_u64(read_length(&data, 32));
    let mod_len = clamp_u64(read_length(&data, 64));

    let exp_start = 96u64.saturating_add(base_len);
    let mod_start = exp_start.saturating_add(exp_len);
    let head_len = exp_len.min(32) as usize;
    let mut head = [0u8; 32];
    head[32 - head_len..]
        .copy_from_slice(&padded_slice(&data, U256::from(exp_start), head_len));
    let exp_head = U256::from_big_endian(&head);

    let gas = modexp_gas(base_len, exp_len, mod_len, exp_head);
    let gas = u64::try_from(gas).map_err(|_| VmError::OutOfGas)?;
    computation.consume_gas(gas, "MODEXP")?;

    if mod_len == 0 {
        return Ok(());
    }
    let to_usize = |len: u64| usize::try_from(len).map_err(|_| VmError::OutOfGas);
    let (base_len, exp_len, mod_len) = (to_usize(base_len)?, to_usize(exp_len)?, to_usize(mod_len)?);

    let base = padded_slice(&data, U256::from(96), base_len);
    let exponent = padded_slice(&data, U256::from(exp_start), exp_len);
    let modulus = padded_slice(&data, U256::from(mod_start), mod_len);

    let result = aurora_engine_modexp::modexp(&base, &exponent, &modulus);
    let result = &result[result.len().saturating_sub(mod_len)..];
    let mut output = vec![0u8; mod_len];
    output[mod_len - result.len()..].copy_from_slice(result);
    computation.set_output(output);
    Ok(())
}
