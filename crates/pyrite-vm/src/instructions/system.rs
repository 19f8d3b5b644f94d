//! 0xf0s: contract creation, message calls and halting

use super::saturating_usize;
use crate::computation::Computation;
use crate::error::{InstructionResult, Interrupt, VmError};
use crate::fork::Fork;
use crate::gas::{cost, max_child_gas_eip150};
use crate::message::Message;
use crate::state::VmState;
use primitive_types::H160;
use pyrite_crypto::keccak256;
use pyrite_primitives::{Address, U256};
use rlp::RlpStream;

/// Address of the contract created by `sender` at `nonce`: `keccak(rlp([sender, nonce]))[12..]`
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&H160::from(*sender.as_bytes()));
    stream.append(&nonce);
    let hash = keccak256(&stream.out());
    Address::from_padded(hash.as_bytes())
}

fn ensure_writable(computation: &Computation) -> Result<(), VmError> {
    if computation.msg().is_static {
        return Err(VmError::WriteProtection);
    }
    Ok(())
}

fn push_bool(computation: &mut Computation, value: bool) -> Result<(), VmError> {
    let word = if value { U256::one() } else { U256::zero() };
    computation.stack_mut().push_uint(word)
}

/// CREATE
pub fn create(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    ensure_writable(computation)?;
    let [endowment, mem_start, mem_size] = computation.stack_mut().pop_uints()?;
    computation.extend_memory(mem_start, mem_size)?;

    let creator = computation.msg().storage_address();
    let depth = computation.msg().depth + 1;
    let insufficient_funds = state.account_db().get_balance(&creator)? < endowment;
    if insufficient_funds || depth > cost::MAX_CALL_DEPTH {
        computation.stack_mut().push_uint(U256::zero())?;
        return Ok(());
    }

    let init_code = computation.memory_read(mem_start, mem_size)?;
    let remaining = computation.get_gas_remaining();
    let child_gas = if computation.spec().is_enabled(Fork::TangerineWhistle) {
        max_child_gas_eip150(remaining)
    } else {
        remaining
    };
    computation.consume_gas(child_gas, "CREATE child gas")?;

    let nonce = state.account_db().get_nonce(&creator)?;
    state.account_db_mut().increment_nonce(&creator)?;
    let address = contract_address(&creator, nonce);

    // The forwarded gas stays consumed on a collision
    if state.account_db().account_has_code_or_nonce(&address)? {
        tracing::debug!(%address, "CREATE address collision");
        computation.stack_mut().push_uint(U256::zero())?;
        return Ok(());
    }

    let child_msg = Message::create(child_gas, creator, endowment, init_code, address).with_depth(depth);
    let child = computation.apply_child_computation(state, child_msg)?;
    let (failed, gas_left) = (child.is_error(), child.get_gas_remaining());

    if failed {
        computation.stack_mut().push_uint(U256::zero())?;
    } else {
        computation.stack_mut().push_address(&address)?;
    }
    computation.return_gas(gas_left);
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

struct CallParams {
    gas: U256,
    to: Address,
    sender: Address,
    value: U256,
    code_address: Option<Address>,
    input: (U256, U256),
    output: (U256, U256),
    should_transfer_value: bool,
    is_static: bool,
}

fn pop_call_params(computation: &mut Computation, kind: CallKind) -> Result<CallParams, VmError> {
    let stack = computation.stack_mut();
    let gas = stack.pop1_uint()?;
    let target = stack.pop1_address()?;
    let popped_value = match kind {
        CallKind::Call | CallKind::CallCode => Some(stack.pop1_uint()?),
        CallKind::DelegateCall | CallKind::StaticCall => None,
    };
    let [in_start, in_size, out_start, out_size] = stack.pop_uints()?;

    let msg = computation.msg();
    let storage_address = msg.storage_address();
    let (to, sender, value, code_address, should_transfer_value, is_static) = match kind {
        CallKind::Call => (target, storage_address, popped_value, None, true, msg.is_static),
        CallKind::CallCode => (
            storage_address,
            storage_address,
            popped_value,
            Some(target),
            true,
            msg.is_static,
        ),
        CallKind::DelegateCall => (
            storage_address,
            msg.sender,
            Some(msg.value),
            Some(target),
            false,
            msg.is_static,
        ),
        CallKind::StaticCall => (target, storage_address, None, None, false, true),
    };

    Ok(CallParams {
        gas,
        to,
        sender,
        value: value.unwrap_or_default(),
        code_address,
        input: (in_start, in_size),
        output: (out_start, out_size),
        should_transfer_value,
        is_static,
    })
}

/// Value-transfer and new-account surcharges
fn call_extra_gas(
    computation: &Computation,
    state: &VmState<'_>,
    kind: CallKind,
    params: &CallParams,
) -> Result<u64, Interrupt> {
    let transfers_value = matches!(kind, CallKind::Call | CallKind::CallCode) && !params.value.is_zero();
    let transfer_fee = if transfers_value { cost::CALL_VALUE } else { 0 };
    if kind != CallKind::Call {
        return Ok(transfer_fee);
    }

    let db = state.account_db();
    // EIP-161: only charge when value lands in a dead account
    let creates_account = if computation.spec().is_enabled(Fork::SpuriousDragon) {
        transfers_value && (!db.account_exists(&params.to)? || db.account_is_empty(&params.to)?)
    } else {
        !db.account_exists(&params.to)?
    };
    let new_account_fee = if creates_account { cost::CALL_NEW_ACCOUNT } else { 0 };
    Ok(transfer_fee + new_account_fee)
}

/// Gas handed to the child (stipend included) and the total charged to the caller
fn call_gas(
    computation: &Computation,
    kind: CallKind,
    requested: U256,
    extra_gas: u64,
    value: U256,
) -> Result<(u64, u64), VmError> {
    let stipend = match kind {
        CallKind::Call | CallKind::CallCode if !value.is_zero() => cost::CALL_STIPEND,
        _ => 0,
    };

    if computation.spec().is_enabled(Fork::TangerineWhistle) {
        // EIP-150: all but one 64th of what remains after the surcharges
        let remaining = computation.get_gas_remaining();
        if remaining < extra_gas {
            return Err(VmError::OutOfGas);
        }
        let cap = max_child_gas_eip150(remaining - extra_gas);
        let gas = if requested < U256::from(cap) {
            requested.low_u64()
        } else {
            cap
        };
        Ok((gas + stipend, gas + extra_gas))
    } else {
        if requested > U256::from(u64::MAX) {
            return Err(VmError::OutOfGas);
        }
        let gas = requested.low_u64();
        let total_fee = gas.checked_add(extra_gas).ok_or(VmError::OutOfGas)?;
        Ok((gas.saturating_add(stipend), total_fee))
    }
}

fn message_call(computation: &mut Computation, state: &mut VmState<'_>, kind: CallKind) -> InstructionResult {
    let params = pop_call_params(computation, kind)?;
    if kind == CallKind::Call && computation.msg().is_static && !params.value.is_zero() {
        return Err(VmError::WriteProtection.into());
    }

    let (in_start, in_size) = params.input;
    let (out_start, out_size) = params.output;
    computation.extend_memory(in_start, in_size)?;
    computation.extend_memory(out_start, out_size)?;
    let call_data = computation.memory_read(in_start, in_size)?;

    let extra_gas = call_extra_gas(computation, state, kind, &params)?;
    let (child_gas, total_fee) = call_gas(computation, kind, params.gas, extra_gas, params.value)?;
    computation.consume_gas(total_fee, "CALL child gas")?;

    let storage_address = computation.msg().storage_address();
    let depth = computation.msg().depth + 1;
    let insufficient_funds =
        params.should_transfer_value && state.account_db().get_balance(&storage_address)? < params.value;
    if insufficient_funds || depth > cost::MAX_CALL_DEPTH {
        tracing::debug!(?kind, insufficient_funds, depth, "call skipped");
        computation.set_return_data(Vec::new());
        computation.return_gas(child_gas);
        push_bool(computation, false)?;
        return Ok(());
    }

    let code_source = params.code_address.unwrap_or(params.to);
    let code = state.account_db().get_code(&code_source)?;
    let mut child_msg = Message::new(child_gas, params.to, params.sender, params.value, call_data, code)
        .with_depth(depth)
        .with_static(params.is_static)
        .with_value_transfer(params.should_transfer_value);
    if let Some(code_address) = params.code_address {
        child_msg = child_msg.with_code_address(code_address);
    }

    let child = computation.apply_child_computation(state, child_msg)?;
    let success = child.is_success();
    let output = (!child.should_erase_return_data()).then(|| child.output().to_vec());
    let gas_left = child.should_return_gas().then(|| child.get_gas_remaining());

    push_bool(computation, success)?;
    if let Some(output) = output {
        let size = saturating_usize(out_size).min(output.len());
        computation.memory_write(out_start, &output[..size])?;
    }
    if let Some(gas_left) = gas_left {
        computation.return_gas(gas_left);
    }
    Ok(())
}

/// CALL
pub fn call(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    message_call(computation, state, CallKind::Call)
}

/// CALLCODE: another account's code against this account's storage
pub fn callcode(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    message_call(computation, state, CallKind::CallCode)
}

/// DELEGATECALL: like CALLCODE, keeping the caller and value
pub fn delegatecall(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    message_call(computation, state, CallKind::DelegateCall)
}

/// STATICCALL: a call whose whole subtree is read-only
pub fn staticcall(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    message_call(computation, state, CallKind::StaticCall)
}

fn read_output(computation: &mut Computation) -> InstructionResult {
    let [offset, size] = computation.stack_mut().pop_uints()?;
    computation.extend_memory(offset, size)?;
    let output = computation.memory_read(offset, size)?;
    computation.set_output(output);
    Ok(())
}

/// RETURN
pub fn return_op(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    read_output(computation)?;
    Err(Interrupt::Halt)
}

/// REVERT: halt with an error that keeps gas and output
pub fn revert(computation: &mut Computation, _state: &mut VmState<'_>) -> InstructionResult {
    read_output(computation)?;
    Err(VmError::Revert.into())
}

/// SELFDESTRUCT
pub fn selfdestruct(computation: &mut Computation, state: &mut VmState<'_>) -> InstructionResult {
    ensure_writable(computation)?;
    let beneficiary = computation.stack_mut().pop1_address()?;
    let address = computation.msg().storage_address();
    let spec = computation.spec();

    let db = state.account_db();
    let surcharge = if spec.is_enabled(Fork::SpuriousDragon) {
        let is_dead = !db.account_exists(&beneficiary)? || db.account_is_empty(&beneficiary)?;
        is_dead && !db.get_balance(&address)?.is_zero()
    } else if spec.is_enabled(Fork::TangerineWhistle) {
        !db.account_exists(&beneficiary)?
    } else {
        false
    };
    if surcharge {
        computation.consume_gas(cost::SELFDESTRUCT_NEW_ACCOUNT, "SELFDESTRUCT new account")?;
    }

    let db = state.account_db_mut();
    let local_balance = db.get_balance(&address)?;
    let beneficiary_balance = db.get_balance(&beneficiary)?;
    db.set_balance(&beneficiary, beneficiary_balance.saturating_add(local_balance))?;
    // After the credit, so a contract naming itself ends up with nothing
    db.set_balance(&address, U256::zero())?;

    tracing::debug!(%address, %beneficiary, "SELFDESTRUCT");
    computation.register_account_for_deletion(beneficiary)?;
    Err(Interrupt::Halt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::test_utils::{run_code, run_with_db, top, CONTRACT};
    use pyrite_db::{AccountDb, AccountState, MemoryDb, BLANK_ROOT_HASH};

    const CALLEE: Address = Address::from_bytes([0x30; 20]);

    // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    const RETURN_42: [u8; 11] = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3, 0x00];

    fn call_code(opcode: u8, target: &Address, gas: u16) -> Vec<u8> {
        // out size 32, out offset 0, in size 0, in offset 0
        let mut code = vec![0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00];
        if opcode == 0xf1 || opcode == 0xf2 {
            code.extend([0x60, 0x00]);
        }
        code.push(0x73);
        code.extend_from_slice(target.as_bytes());
        code.push(0x61);
        code.extend(gas.to_be_bytes());
        code.push(opcode);
        code
    }

    #[test]
    fn test_contract_address_vectors() {
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            contract_address(&sender, 0),
            Address::from_hex("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
        );
        assert_eq!(
            contract_address(&sender, 1),
            Address::from_hex("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap()
        );
    }

    #[test]
    fn test_return_sets_output() {
        let computation = run_code(&RETURN_42, 1000);
        assert!(computation.is_success());
        assert_eq!(computation.output().len(), 32);
        assert_eq!(computation.output()[31], 0x2a);
    }

    #[test]
    fn test_revert_keeps_output_and_gas() {
        let mut code = RETURN_42;
        code[9] = 0xfd;
        let computation = run_code(&code, 1000);
        assert_eq!(computation.error(), Some(&VmError::Revert));
        assert_eq!(computation.output()[31], 0x2a);
        assert_eq!(computation.get_gas_used(), 18);
        assert_eq!(computation.get_gas_remaining(), 982);
    }

    #[test]
    fn test_call_returns_output_and_gas() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        db.set_code(&CALLEE, &RETURN_42).unwrap();
        let computation = run_with_db(Fork::Byzantium, &mut db, &call_code(0xf1, &CALLEE, 0xffff), 100_000);

        assert!(computation.is_success(), "{:?}", computation.error());
        assert_eq!(top(&computation), U256::one());
        assert_eq!(computation.memory().as_slice()[31], 0x2a);
        assert_eq!(computation.return_data().len(), 32);
        assert_eq!(computation.children().len(), 1);
        // 7 pushes, CALL, one word of memory, callee's 18
        assert_eq!(computation.get_gas_used(), 21 + 700 + 3 + 18);
    }

    #[test]
    fn test_frontier_call_to_missing_account_charges_new_account() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        let computation = run_with_db(Fork::Frontier, &mut db, &call_code(0xf1, &CALLEE, 0), 100_000);
        assert!(computation.is_success());
        assert_eq!(computation.get_gas_used(), 21 + 40 + 3 + 25_000);
    }

    #[test]
    fn test_call_with_too_much_gas_frontier_out_of_gas() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        db.set_code(&CALLEE, &RETURN_42).unwrap();
        let computation = run_with_db(Fork::Homestead, &mut db, &call_code(0xf1, &CALLEE, 0xffff), 50_000);
        assert_eq!(computation.error(), Some(&VmError::OutOfGas));
    }

    #[test]
    fn test_staticcall_undefined_before_byzantium() {
        let computation = run_code(&call_code(0xfa, &CALLEE, 0), 100_000);
        assert!(computation.is_success());
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        let computation = run_with_db(Fork::SpuriousDragon, &mut db, &call_code(0xfa, &CALLEE, 0), 100_000);
        assert_eq!(computation.error(), Some(&VmError::InvalidOpcode(0xfa)));
    }

    #[test]
    fn test_create_deploys_code() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        // init: PUSH1 0, PUSH1 0, MSTORE8, PUSH1 1, PUSH1 0, RETURN -> runtime code [0x00]
        let init = [0x60, 0x00, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3];
        let mut code = vec![0x69];
        code.extend(init);
        // PUSH1 0, MSTORE, PUSH1 10, PUSH1 22, PUSH1 0, CREATE
        code.extend([0x60, 0x00, 0x52, 0x60, 0x0a, 0x60, 0x16, 0x60, 0x00, 0xf0]);

        let computation = run_with_db(Fork::Byzantium, &mut db, &code, 200_000);
        assert!(computation.is_success(), "{:?}", computation.error());
        let created = contract_address(&CONTRACT, 0);
        assert_eq!(top(&computation), created.to_word());
        assert_eq!(db.get_code(&created).unwrap(), vec![0x00]);
        assert_eq!(db.get_nonce(&created).unwrap(), 1);
        assert_eq!(db.get_nonce(&CONTRACT).unwrap(), 1);
        assert!(computation.return_data().is_empty());
    }

    #[test]
    fn test_selfdestruct_moves_balance() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        db.set_balance(&CONTRACT, U256::from(100)).unwrap();
        let mut code = vec![0x73];
        code.extend_from_slice(CALLEE.as_bytes());
        code.push(0xff);

        let computation = run_with_db(Fork::Byzantium, &mut db, &code, 100_000);
        assert!(computation.is_success());
        assert_eq!(computation.get_accounts_for_deletion(), vec![(CONTRACT, CALLEE)]);
        assert_eq!(db.get_balance(&CALLEE).unwrap(), U256::from(100));
        assert_eq!(db.get_balance(&CONTRACT).unwrap(), U256::zero());
        // Dead beneficiary receiving value pays the surcharge
        assert_eq!(computation.get_gas_used(), 3 + 5000 + 25_000);
    }

    #[test]
    fn test_selfdestruct_to_self_burns_balance() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        db.set_balance(&CONTRACT, U256::from(100)).unwrap();
        let mut code = vec![0x73];
        code.extend_from_slice(CONTRACT.as_bytes());
        code.push(0xff);

        let computation = run_with_db(Fork::Frontier, &mut db, &code, 100_000);
        assert!(computation.is_success());
        assert_eq!(db.get_balance(&CONTRACT).unwrap(), U256::zero());
        assert_eq!(computation.get_gas_used(), 3);
    }
}
