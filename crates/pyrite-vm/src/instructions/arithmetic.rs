//! 0x00s: arithmetic

use crate::computation::Computation;
use crate::error::InstructionResult;
use crate::state::VmState;
use primitive_types::U512;
use pyrite_primitives::U256;

fn is_negative(value: &U256) -> bool {
    value.bit(255)
}

fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(&value) {
        twos_complement(value)
    } else {
        value
    }
}

// Only called with values already reduced below a U256 modulus
fn low_u256(value: U512) -> U256 {
    U256([value.0[0], value.0[1], value.0[2], value.0[3]])
}

/// ADD
pub fn add(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    stack.push_uint(a.overflowing_add(b).0)?;
    Ok(())
}

/// MUL
pub fn mul(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    stack.push_uint(a.overflowing_mul(b).0)?;
    Ok(())
}

/// SUB
pub fn sub(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    stack.push_uint(a.overflowing_sub(b).0)?;
    Ok(())
}

/// DIV; division by zero gives zero
pub fn div(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    let result = if b.is_zero() { U256::zero() } else { a / b };
    stack.push_uint(result)?;
    Ok(())
}

/// SDIV
pub fn sdiv(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    let result = if b.is_zero() {
        U256::zero()
    } else {
        let quotient = abs(a) / abs(b);
        if is_negative(&a) != is_negative(&b) {
            twos_complement(quotient)
        } else {
            quotient
        }
    };
    stack.push_uint(result)?;
    Ok(())
}

/// MOD
pub fn modulo(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    let result = if b.is_zero() { U256::zero() } else { a % b };
    stack.push_uint(result)?;
    Ok(())
}

/// SMOD; the result takes the sign of the dividend
pub fn smod(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    let result = if b.is_zero() {
        U256::zero()
    } else {
        let remainder = abs(a) % abs(b);
        if is_negative(&a) {
            twos_complement(remainder)
        } else {
            remainder
        }
    };
    stack.push_uint(result)?;
    Ok(())
}

/// ADDMOD, without intermediate overflow
pub fn addmod(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b, n] = stack.pop_uints()?;
    let result = if n.is_zero() {
        U256::zero()
    } else {
        low_u256((U512::from(a) + U512::from(b)) % U512::from(n))
    };
    stack.push_uint(result)?;
    Ok(())
}

/// MULMOD, without intermediate overflow
pub fn mulmod(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b, n] = stack.pop_uints()?;
    let result = if n.is_zero() {
        U256::zero()
    } else {
        low_u256(a.full_mul(b) % U512::from(n))
    };
    stack.push_uint(result)?;
    Ok(())
}

/// EXP; charges per byte of the exponent
pub fn exp(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let [base, exponent] = computation.stack_mut().pop_uints()?;
    let exponent_bytes = (exponent.bits() as u64).div_ceil(8);
    let result = if base.is_zero() {
        U256::zero()
    } else {
        base.overflowing_pow(exponent).0
    };

    let byte_gas = computation.spec().schedule.exp_byte * exponent_bytes;
    computation.consume_gas(byte_gas, "EXP exponent")?;
    computation.stack_mut().push_uint(result)?;
    Ok(())
}

/// SIGNEXTEND from byte `b` (0 = lowest)
pub fn signextend(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let [b, value] = stack.pop_uints()?;
    let result = if b < U256::from(31) {
        let sign_bit = b.low_u64() as usize * 8 + 7;
        let sign = U256::one() << sign_bit;
        let mask = (sign - 1) | sign;
        if value.bit(sign_bit) {
            value | !mask
        } else {
            value & mask
        }
    } else {
        value
    };
    stack.push_uint(result)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;
    use crate::fork::Fork;
    use crate::instructions::test_utils::{run_code, run_code_on, top};
    use proptest::prelude::*;

    fn push32(value: U256) -> Vec<u8> {
        let mut code = vec![0x7f];
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        code.extend_from_slice(&word);
        code
    }

    /// Run `opcode` with `args` pushed so the first arg ends on top
    fn binary(opcode: u8, args: &[U256]) -> U256 {
        let mut code = Vec::new();
        for arg in args.iter().rev() {
            code.extend(push32(*arg));
        }
        code.push(opcode);
        let computation = run_code(&code, 1_000_000);
        assert!(computation.is_success(), "{:?}", computation.error());
        top(&computation)
    }

    fn neg(value: u64) -> U256 {
        twos_complement(U256::from(value))
    }

    #[test]
    fn test_add_wraps() {
        assert_eq!(binary(0x01, &[U256::MAX, U256::from(2)]), U256::one());
    }

    #[test]
    fn test_sub_order() {
        // a - b with a on top
        assert_eq!(binary(0x03, &[U256::from(10), U256::from(3)]), U256::from(7));
        assert_eq!(binary(0x03, &[U256::zero(), U256::one()]), U256::MAX);
    }

    #[test]
    fn test_div_and_mod_by_zero() {
        assert_eq!(binary(0x04, &[U256::from(10), U256::zero()]), U256::zero());
        assert_eq!(binary(0x06, &[U256::from(10), U256::zero()]), U256::zero());
        assert_eq!(binary(0x05, &[U256::from(10), U256::zero()]), U256::zero());
        assert_eq!(binary(0x07, &[U256::from(10), U256::zero()]), U256::zero());
    }

    #[test]
    fn test_sdiv() {
        assert_eq!(binary(0x05, &[neg(10), U256::from(3)]), neg(3));
        assert_eq!(binary(0x05, &[neg(10), neg(3)]), U256::from(3));
        // -2^255 / -1 overflows back to -2^255
        let min = U256::one() << 255;
        assert_eq!(binary(0x05, &[min, U256::MAX]), min);
    }

    #[test]
    fn test_smod_takes_dividend_sign() {
        assert_eq!(binary(0x07, &[neg(10), U256::from(3)]), neg(1));
        assert_eq!(binary(0x07, &[U256::from(10), neg(3)]), U256::one());
    }

    #[test]
    fn test_addmod_mulmod_no_overflow() {
        assert_eq!(
            binary(0x08, &[U256::MAX, U256::from(2), U256::from(2)]),
            U256::zero()
        );
        assert_eq!(
            binary(0x09, &[U256::MAX, U256::MAX, U256::from(12)]),
            U256::from(9)
        );
        assert_eq!(binary(0x09, &[U256::one(), U256::one(), U256::zero()]), U256::zero());
    }

    #[test]
    fn test_exp_gas_by_fork() {
        // PUSH1 0xff (exponent, one byte), PUSH1 2, EXP
        let code = [0x60, 0xff, 0x60, 0x02, 0x0a];
        let frontier = run_code_on(Fork::Frontier, &code, 1000);
        assert_eq!(top(&frontier), U256::one() << 255);
        assert_eq!(frontier.get_gas_used(), 3 + 3 + 10 + 10);

        let spurious = run_code_on(Fork::SpuriousDragon, &code, 1000);
        assert_eq!(spurious.get_gas_used(), 3 + 3 + 10 + 50);
    }

    #[test]
    fn test_exp_zero_exponent_is_free() {
        let code = [0x60, 0x00, 0x60, 0x05, 0x0a];
        let computation = run_code(&code, 1000);
        assert_eq!(top(&computation), U256::one());
        assert_eq!(computation.get_gas_used(), 16);
    }

    #[test]
    fn test_exp_zero_base_is_zero() {
        // 0 ** 0
        let computation = run_code(&[0x60, 0x00, 0x60, 0x00, 0x0a], 1000);
        assert!(computation.is_success());
        assert_eq!(top(&computation), U256::zero());
        assert_eq!(computation.get_gas_used(), 16);

        // 0 ** 2 still pays for the exponent byte
        let computation = run_code(&[0x60, 0x02, 0x60, 0x00, 0x0a], 1000);
        assert_eq!(top(&computation), U256::zero());
        assert_eq!(computation.get_gas_used(), 16 + computation.spec().schedule.exp_byte);
    }

    #[test]
    fn test_exp_out_of_gas() {
        let code = [0x60, 0xff, 0x60, 0x02, 0x0a];
        let computation = run_code(&code, 20);
        assert_eq!(computation.error(), Some(&VmError::OutOfGas));
        assert_eq!(computation.get_gas_remaining(), 0);
    }

    #[test]
    fn test_signextend() {
        assert_eq!(binary(0x0b, &[U256::zero(), U256::from(0xff)]), U256::MAX);
        assert_eq!(binary(0x0b, &[U256::zero(), U256::from(0x7f)]), U256::from(0x7f));
        assert_eq!(
            binary(0x0b, &[U256::one(), U256::from(0x1_80ff)]),
            U256::MAX - U256::from(0x7f00)
        );
        assert_eq!(binary(0x0b, &[U256::from(31), U256::from(5)]), U256::from(5));
        assert_eq!(binary(0x0b, &[U256::MAX, U256::from(0xff)]), U256::from(0xff));
    }

    proptest! {
        #[test]
        fn prop_abs_roundtrip(value in any::<u64>()) {
            let v = U256::from(value);
            prop_assert_eq!(abs(twos_complement(v)), v);
        }
    }
}
