//! 0x10s: comparison and bitwise logic

use crate::computation::Computation;
use crate::error::InstructionResult;
use crate::state::VmState;
use pyrite_primitives::U256;

fn bool_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

// Flipping the sign bit maps two's complement order onto unsigned order
fn signed_key(value: U256) -> U256 {
    value ^ (U256::one() << 255)
}

fn compare(computation: &mut Computation, op: fn(U256, U256) -> U256) -> InstructionResult {
    let stack = computation.stack_mut();
    let [a, b] = stack.pop_uints()?;
    stack.push_uint(op(a, b))?;
    Ok(())
}

/// LT
pub fn lt(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| bool_word(a < b))
}

/// GT
pub fn gt(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| bool_word(a > b))
}

/// SLT
pub fn slt(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| bool_word(signed_key(a) < signed_key(b)))
}

/// SGT
pub fn sgt(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| bool_word(signed_key(a) > signed_key(b)))
}

/// EQ
pub fn eq(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| bool_word(a == b))
}

/// AND
pub fn and(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| a & b)
}

/// OR
pub fn or(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| a | b)
}

/// XOR
pub fn xor(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |a, b| a ^ b)
}

/// ISZERO
pub fn iszero(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let value = stack.pop1_uint()?;
    stack.push_uint(bool_word(value.is_zero()))?;
    Ok(())
}

/// NOT
pub fn not(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    let stack = computation.stack_mut();
    let value = stack.pop1_uint()?;
    stack.push_uint(!value)?;
    Ok(())
}

/// BYTE; index 0 is the most significant byte
pub fn byte(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    compare(computation, |index, value| {
        if index >= U256::from(32) {
            U256::zero()
        } else {
            U256::from(value.byte(31 - index.as_usize()))
        }
    })
}
