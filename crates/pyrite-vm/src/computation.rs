//! The execution state machine for one message

use crate::code_stream::CodeStream;
use crate::error::{Error, Interrupt, InstructionResult, VmError, VmResult};
use crate::fork::{Fork, ForkSpec};
use crate::gas::{cost, memory_gas_cost, GasMeter};
use crate::memory::Memory;
use crate::message::{Message, TransactionContext};
use crate::opcode::Opcode;
use crate::stack::Stack;
use crate::state::VmState;
use pyrite_db::BalanceDelta;
use pyrite_primitives::{Address, ValidationError, H256, U256};
use std::collections::BTreeMap;

/// Log record emitted by LOG0..LOG4
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Emitting account
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Payload
    pub data: Vec<u8>,
}

/// Interpreter run over one message, plus the children it spawned.
///
/// Mutated only while its own run is in progress; read-only afterwards.
#[derive(Debug)]
pub struct Computation {
    msg: Message,
    tx_context: TransactionContext,
    spec: &'static ForkSpec,
    stack: Stack,
    memory: Memory,
    gas_meter: GasMeter,
    code: CodeStream,
    children: Vec<Computation>,
    output: Vec<u8>,
    return_data: Vec<u8>,
    error: Option<VmError>,
    accounts_to_delete: BTreeMap<Address, Address>,
    log_entries: Vec<(u64, LogEntry)>,
}

impl Computation {
    /// Fresh computation; nothing runs until one of the `apply_*` entry points
    pub fn new(spec: &'static ForkSpec, msg: Message, tx_context: TransactionContext) -> Self {
        let gas_meter = GasMeter::new(msg.gas);
        let code = CodeStream::new(msg.code.clone());
        Self {
            msg,
            tx_context,
            spec,
            stack: Stack::new(),
            memory: Memory::new(),
            gas_meter,
            code,
            children: Vec::new(),
            output: Vec::new(),
            return_data: Vec::new(),
            error: None,
            accounts_to_delete: BTreeMap::new(),
            log_entries: Vec::new(),
        }
    }

    // ==================== Entry points ====================

    /// Run `message` against `state` without snapshotting or moving value.
    ///
    /// VM errors end up in [`Computation::error`]; only validation and state
    /// backend failures are returned as `Err`.
    pub fn apply_computation(
        state: &mut VmState<'_>,
        message: Message,
        tx_context: TransactionContext,
    ) -> VmResult<Self> {
        let mut computation = Self::new(state.spec(), message, tx_context);
        let outcome = computation.execute(state);
        computation.finish(outcome)?;
        Ok(computation)
    }

    /// Run a call message inside its own snapshot, moving value first
    pub fn apply_message(
        state: &mut VmState<'_>,
        message: Message,
        tx_context: TransactionContext,
    ) -> VmResult<Self> {
        let snapshot = state.snapshot();

        if message.depth > cost::MAX_CALL_DEPTH {
            let mut computation = Self::new(state.spec(), message, tx_context);
            computation.set_error(VmError::StackDepthLimit);
            state.revert(snapshot)?;
            return Ok(computation);
        }

        if message.should_transfer_value && !message.value.is_zero() {
            let sender_balance = state.account_db().get_balance(&message.sender)?;
            if sender_balance < message.value {
                let mut computation = Self::new(state.spec(), message, tx_context);
                computation.set_error(VmError::InsufficientFunds);
                state.revert(snapshot)?;
                return Ok(computation);
            }
            let db = state.account_db_mut();
            db.delta_balance(&message.sender, BalanceDelta::Debit(message.value))?;
            db.delta_balance(&message.storage_address(), BalanceDelta::Credit(message.value))?;
        }

        state.account_db_mut().touch_account(&message.storage_address())?;

        let computation = Self::apply_computation(state, message, tx_context)?;
        if computation.is_error() {
            state.revert(snapshot)?;
        } else {
            state.commit(snapshot)?;
        }
        Ok(computation)
    }

    /// Run a creation message and deposit the returned code
    pub fn apply_create_message(
        state: &mut VmState<'_>,
        message: Message,
        tx_context: TransactionContext,
    ) -> VmResult<Self> {
        let spec = state.spec();
        let contract_address = message.storage_address();
        let snapshot = state.snapshot();

        // EIP-161: new contracts start at nonce 1
        if spec.is_enabled(Fork::SpuriousDragon) {
            state.account_db_mut().increment_nonce(&contract_address)?;
        }

        let mut computation = Self::apply_message(state, message, tx_context)?;
        if computation.is_error() {
            state.revert(snapshot)?;
            return Ok(computation);
        }

        let contract_code = std::mem::take(&mut computation.output);
        if contract_code.is_empty() {
            state.commit(snapshot)?;
            return Ok(computation);
        }

        if spec.is_enabled(Fork::SpuriousDragon) && contract_code.len() > cost::MAX_CODE_SIZE {
            computation.output = contract_code;
            computation.set_error(VmError::ContractCodeSizeLimit);
            state.revert(snapshot)?;
            return Ok(computation);
        }

        let deposit = (contract_code.len() as u64).saturating_mul(cost::CODE_DEPOSIT);
        match computation.gas_meter.consume(deposit, "code deposit") {
            Ok(()) => {
                state.account_db_mut().set_code(&contract_address, &contract_code)?;
                computation.output = contract_code;
                state.commit(snapshot)?;
            }
            Err(err) if spec.is_enabled(Fork::Homestead) => {
                computation.output = contract_code;
                computation.set_error(err);
                state.revert(snapshot)?;
            }
            // Frontier keeps the account, just without code
            Err(_) => {
                state.commit(snapshot)?;
            }
        }
        Ok(computation)
    }

    fn execute(&mut self, state: &mut VmState<'_>) -> InstructionResult {
        if let Some(precompile) = self.spec.precompiles.get(&self.msg.code_address()) {
            tracing::trace!(address = %self.msg.code_address(), "precompile");
            return precompile(self).map_err(Interrupt::from);
        }

        loop {
            let pc = self.code.pc();
            let opcode = self.code.next_opcode();
            tracing::trace!(
                pc,
                opcode = Opcode::name_of(opcode),
                gas = self.gas_meter.gas_remaining(),
                depth = self.msg.depth,
                "step"
            );
            self.spec.opcodes.execute(opcode, self, state)?;
        }
    }

    fn finish(&mut self, outcome: InstructionResult) -> VmResult<()> {
        match outcome {
            Ok(()) | Err(Interrupt::Halt) => Ok(()),
            Err(Interrupt::Vm(err)) => {
                self.set_error(err);
                Ok(())
            }
            Err(Interrupt::Fatal(err)) => Err(err),
        }
    }

    fn set_error(&mut self, err: VmError) {
        tracing::debug!(depth = self.msg.depth, error = %err, "computation failed");
        if err.burns_gas() {
            self.gas_meter.burn_remaining();
        }
        self.error = Some(err);
    }

    // ==================== Child messages ====================

    /// Run a child message and record it; returns the finished child
    pub(crate) fn apply_child_computation(
        &mut self,
        state: &mut VmState<'_>,
        child_msg: Message,
    ) -> VmResult<&Computation> {
        let tx_context = self.tx_context.clone();
        let child = if child_msg.is_create() {
            Self::apply_create_message(state, child_msg, tx_context)?
        } else {
            Self::apply_message(state, child_msg, tx_context)?
        };
        self.add_child_computation(child);
        self.children
            .last()
            .ok_or_else(|| Error::Validation(ValidationError::invalid("child computation missing")))
    }

    fn add_child_computation(&mut self, child: Computation) {
        self.return_data = match (child.is_error(), child.msg.is_create()) {
            (true, true) => child.output().to_vec(),
            (true, false) if child.should_burn_gas() => Vec::new(),
            (true, false) => child.output().to_vec(),
            (false, true) => Vec::new(),
            (false, false) => child.output().to_vec(),
        };
        tracing::debug!(
            depth = child.msg.depth,
            to = %child.msg.storage_address(),
            success = child.is_success(),
            gas_used = child.get_gas_used(),
            "child computation finished"
        );
        self.children.push(child);
    }

    // ==================== Helpers for instructions ====================

    /// Charge gas
    pub fn consume_gas(&mut self, amount: u64, reason: &str) -> Result<(), VmError> {
        self.gas_meter.consume(amount, reason)
    }

    /// Give gas back
    pub fn return_gas(&mut self, amount: u64) {
        self.gas_meter.return_gas(amount)
    }

    /// Grant a refund
    pub fn refund_gas(&mut self, amount: u64) {
        self.gas_meter.refund(amount)
    }

    /// Grow memory over `offset..offset + size`, charging the expansion.
    pub fn extend_memory(&mut self, offset: U256, size: U256) -> Result<(), VmError> {
        if size.is_zero() {
            return Ok(());
        }
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= U256::from(u64::MAX))
            .ok_or(VmError::OutOfGas)?
            .as_u64();
        let before = memory_gas_cost(self.memory.len() as u64);
        let after = memory_gas_cost(end);
        if after > before {
            let fee = u64::try_from(after - before).map_err(|_| VmError::OutOfGas)?;
            self.gas_meter.consume(fee, "memory expansion")?;
        }
        let end = usize::try_from(end).map_err(|_| VmError::OutOfGas)?;
        // offset + size == end, so both fit
        self.memory.extend(end - size.as_usize(), size.as_usize());
        Ok(())
    }

    /// Copy of an already extended memory region
    pub fn memory_read(&self, offset: U256, size: U256) -> Result<Vec<u8>, ValidationError> {
        if size.is_zero() {
            return Ok(Vec::new());
        }
        let (offset, size) = (to_usize(offset)?, to_usize(size)?);
        Ok(self.memory.read(offset, size)?.to_vec())
    }

    /// Write into an already extended memory region
    pub fn memory_write(&mut self, offset: U256, value: &[u8]) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Ok(());
        }
        self.memory.write(to_usize(offset)?, value.len(), value)
    }

    /// Queue `storage_address` for deletion at the end of the transaction
    pub fn register_account_for_deletion(&mut self, beneficiary: Address) -> Result<(), ValidationError> {
        let address = self.msg.storage_address();
        if self.accounts_to_delete.contains_key(&address) {
            return Err(ValidationError::invalid(format!(
                "{address} registered for deletion twice"
            )));
        }
        self.accounts_to_delete.insert(address, beneficiary);
        Ok(())
    }

    /// Append a log entry tagged with the transaction-wide sequence number
    pub fn add_log_entry(&mut self, address: Address, topics: Vec<H256>, data: Vec<u8>) {
        let counter = self.tx_context.next_log_counter();
        self.log_entries.push((counter, LogEntry { address, topics, data }));
    }

    /// Set the output buffer
    pub fn set_output(&mut self, output: Vec<u8>) {
        self.output = output;
    }

    /// Replace the return-data buffer
    pub(crate) fn set_return_data(&mut self, return_data: Vec<u8>) {
        self.return_data = return_data;
    }

    pub(crate) fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub(crate) fn code_mut(&mut self) -> &mut CodeStream {
        &mut self.code
    }

    // ==================== Accessors ====================

    /// The message being run
    pub fn msg(&self) -> &Message {
        &self.msg
    }

    /// Shared transaction values
    pub fn tx_context(&self) -> &TransactionContext {
        &self.tx_context
    }

    /// Fork rules
    pub fn spec(&self) -> &'static ForkSpec {
        self.spec
    }

    /// Operand stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Code cursor
    pub fn code(&self) -> &CodeStream {
        &self.code
    }

    /// Child computations in spawn order
    pub fn children(&self) -> &[Computation] {
        &self.children
    }

    /// Output of the most recent child call
    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }

    /// Terminal error, if any
    pub fn error(&self) -> Option<&VmError> {
        self.error.as_ref()
    }

    /// Whether the run ended in an error
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the run ended cleanly
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the error forfeits all remaining gas
    pub fn should_burn_gas(&self) -> bool {
        self.error.as_ref().is_some_and(VmError::burns_gas)
    }

    /// Whether unused gas goes back to the caller
    pub fn should_return_gas(&self) -> bool {
        !self.should_burn_gas()
    }

    /// Whether the output is hidden from the caller
    pub fn should_erase_return_data(&self) -> bool {
        self.error.as_ref().is_some_and(VmError::erases_return_data)
    }

    /// Returned bytes; empty when the error erases them
    pub fn output(&self) -> &[u8] {
        if self.should_erase_return_data() {
            &[]
        } else {
            &self.output
        }
    }

    // ==================== Aggregates over the call tree ====================

    /// Gas left for the caller
    pub fn get_gas_remaining(&self) -> u64 {
        if self.should_burn_gas() {
            0
        } else {
            self.gas_meter.gas_remaining()
        }
    }

    /// Gas charged for this message, children included
    pub fn get_gas_used(&self) -> u64 {
        if self.should_burn_gas() {
            self.msg.gas
        } else {
            self.msg.gas.saturating_sub(self.gas_meter.gas_remaining())
        }
    }

    /// Refunds earned by this computation and its successful descendants
    pub fn get_gas_refund(&self) -> u64 {
        if self.is_error() {
            return 0;
        }
        self.children
            .iter()
            .map(Computation::get_gas_refund)
            .fold(self.gas_meter.gas_refunded(), u64::saturating_add)
    }

    /// `(account, beneficiary)` pairs from the successful part of the tree
    pub fn get_accounts_for_deletion(&self) -> Vec<(Address, Address)> {
        let mut merged = BTreeMap::new();
        self.collect_deletions(&mut merged);
        merged.into_iter().collect()
    }

    fn collect_deletions(&self, merged: &mut BTreeMap<Address, Address>) {
        if self.is_error() {
            return;
        }
        merged.extend(self.accounts_to_delete.iter().map(|(a, b)| (*a, *b)));
        for child in &self.children {
            child.collect_deletions(merged);
        }
    }

    /// Logs from the successful part of the tree, in emission order
    pub fn get_log_entries(&self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        self.collect_logs(&mut entries);
        entries.sort_by_key(|(counter, _)| *counter);
        entries.into_iter().map(|(_, entry)| entry).collect()
    }

    fn collect_logs(&self, entries: &mut Vec<(u64, LogEntry)>) {
        if self.is_error() {
            return;
        }
        entries.extend(self.log_entries.iter().cloned());
        for child in &self.children {
            child.collect_logs(entries);
        }
    }
}

fn to_usize(value: U256) -> Result<usize, ValidationError> {
    if value > U256::from(usize::MAX) {
        return Err(ValidationError::OutOfRange {
            what: "memory offset",
            value: value.to_string(),
        });
    }
    Ok(value.as_usize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::BlockContext;
    use pyrite_db::{AccountDb, AccountState, MemoryDb, BLANK_ROOT_HASH};

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn run(fork: Fork, db: &mut AccountDb<MemoryDb>, msg: Message) -> Computation {
        let mut state = VmState::with_fork(db, BlockContext::default(), fork);
        let ctx = TransactionContext::new(U256::one(), msg.sender);
        Computation::apply_message(&mut state, msg, ctx).unwrap()
    }

    #[test]
    fn test_empty_code_succeeds() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        let msg = Message::new(1000, addr(1), addr(2), U256::zero(), vec![], vec![]);
        let computation = run(Fork::Byzantium, &mut db, msg);
        assert!(computation.is_success());
        assert_eq!(computation.get_gas_used(), 0);
        assert_eq!(computation.get_gas_remaining(), 1000);
        // The callee is touched
        assert!(db.account_exists(&addr(1)).unwrap());
    }

    #[test]
    fn test_insufficient_funds_is_child_error() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        let msg = Message::new(1000, addr(1), addr(2), U256::from(5), vec![], vec![]);
        let computation = run(Fork::Byzantium, &mut db, msg);
        assert_eq!(computation.error(), Some(&VmError::InsufficientFunds));
        assert_eq!(computation.get_gas_used(), 1000);
        assert!(!db.account_exists(&addr(1)).unwrap());
    }

    #[test]
    fn test_value_transfer() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        db.set_balance(&addr(2), U256::from(100)).unwrap();
        let msg = Message::new(1000, addr(1), addr(2), U256::from(40), vec![], vec![]);
        let computation = run(Fork::Frontier, &mut db, msg);
        assert!(computation.is_success());
        assert_eq!(db.get_balance(&addr(2)).unwrap(), U256::from(60));
        assert_eq!(db.get_balance(&addr(1)).unwrap(), U256::from(40));
    }

    #[test]
    fn test_depth_limit() {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        let msg = Message::new(1000, addr(1), addr(2), U256::zero(), vec![], vec![0x00])
            .with_depth(cost::MAX_CALL_DEPTH + 1);
        let computation = run(Fork::Frontier, &mut db, msg);
        assert_eq!(computation.error(), Some(&VmError::StackDepthLimit));
    }

    #[test]
    fn test_register_for_deletion_twice_is_validation_error() {
        let msg = Message::new(1000, addr(1), addr(2), U256::zero(), vec![], vec![]);
        let ctx = TransactionContext::new(U256::one(), addr(2));
        let mut computation = Computation::new(Fork::Frontier.spec(), msg, ctx);
        computation.register_account_for_deletion(addr(3)).unwrap();
        assert!(computation.register_account_for_deletion(addr(4)).is_err());
        assert_eq!(computation.get_accounts_for_deletion(), vec![(addr(1), addr(3))]);
    }

    #[test]
    fn test_extend_memory_charges_delta() {
        let msg = Message::new(1000, addr(1), addr(2), U256::zero(), vec![], vec![]);
        let ctx = TransactionContext::new(U256::one(), addr(2));
        let mut computation = Computation::new(Fork::Frontier.spec(), msg, ctx);

        computation.extend_memory(U256::zero(), U256::from(32)).unwrap();
        assert_eq!(computation.gas_meter.gas_remaining(), 997);
        // Same region again is free
        computation.extend_memory(U256::zero(), U256::from(32)).unwrap();
        assert_eq!(computation.gas_meter.gas_remaining(), 997);
        computation.extend_memory(U256::from(32), U256::from(1)).unwrap();
        assert_eq!(computation.gas_meter.gas_remaining(), 994);
        assert_eq!(computation.memory().len(), 64);

        // Zero size never charges, however far away
        computation.extend_memory(U256::MAX, U256::zero()).unwrap();
        assert_eq!(
            computation.extend_memory(U256::MAX, U256::one()),
            Err(VmError::OutOfGas)
        );
        assert_eq!(
            computation.extend_memory(U256::zero(), U256::from(1u64 << 40)),
            Err(VmError::OutOfGas)
        );
        assert_eq!(computation.gas_meter.gas_remaining(), 994);
    }
}
