//! Call and create requests, plus the contexts shared across a call tree

use pyrite_primitives::{Address, H256, U256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// `to` of a contract-creation message
pub const CREATE_CONTRACT_ADDRESS: Address = Address::ZERO;

/// One call or contract-creation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Gas handed to the computation
    pub gas: u64,
    /// Callee; [`CREATE_CONTRACT_ADDRESS`] for creations
    pub to: Address,
    /// Caller
    pub sender: Address,
    /// Value in wei
    pub value: U256,
    /// Call data
    pub data: Vec<u8>,
    /// Code to execute
    pub code: Vec<u8>,
    /// 0 for the transaction's own message
    pub depth: usize,
    /// Read-only call
    pub is_static: bool,
    /// False for DELEGATECALL, which reuses the parent's value without moving it
    pub should_transfer_value: bool,
    code_address: Option<Address>,
    create_address: Option<Address>,
}

impl Message {
    /// Top-level call message
    pub fn new(
        gas: u64,
        to: Address,
        sender: Address,
        value: U256,
        data: Vec<u8>,
        code: Vec<u8>,
    ) -> Self {
        Self {
            gas,
            to,
            sender,
            value,
            data,
            code,
            depth: 0,
            is_static: false,
            should_transfer_value: true,
            code_address: None,
            create_address: None,
        }
    }

    /// Top-level creation message running `init_code` for the account at `create_address`
    pub fn create(
        gas: u64,
        sender: Address,
        value: U256,
        init_code: Vec<u8>,
        create_address: Address,
    ) -> Self {
        Self::new(gas, CREATE_CONTRACT_ADDRESS, sender, value, Vec::new(), init_code)
            .with_create_address(create_address)
    }

    /// Set the call depth
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Mark read-only
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Execute the code of another account
    pub fn with_code_address(mut self, code_address: Address) -> Self {
        self.code_address = Some(code_address);
        self
    }

    /// Turn this into a creation of `create_address`
    pub fn with_create_address(mut self, create_address: Address) -> Self {
        self.create_address = Some(create_address);
        self
    }

    /// Whether value moves from sender to storage address
    pub fn with_value_transfer(mut self, should_transfer_value: bool) -> Self {
        self.should_transfer_value = should_transfer_value;
        self
    }

    /// Whether this message creates a contract
    pub fn is_create(&self) -> bool {
        self.create_address.is_some()
    }

    /// Account whose code runs; defaults to `to`
    pub fn code_address(&self) -> Address {
        self.code_address.unwrap_or(self.to)
    }

    /// Account whose storage and balance the code acts on
    pub fn storage_address(&self) -> Address {
        self.create_address.unwrap_or(self.to)
    }
}

/// Values fixed for a whole transaction and shared by every computation it spawns.
#[derive(Clone, Debug)]
pub struct TransactionContext {
    gas_price: U256,
    origin: Address,
    log_counter: Arc<AtomicU64>,
}

impl TransactionContext {
    /// Context for a transaction from `origin`
    pub fn new(gas_price: U256, origin: Address) -> Self {
        Self {
            gas_price,
            origin,
            log_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Gas price
    pub fn gas_price(&self) -> U256 {
        self.gas_price
    }

    /// Transaction signer
    pub fn origin(&self) -> Address {
        self.origin
    }

    /// Next log sequence number; strictly increasing across the transaction
    pub fn next_log_counter(&self) -> u64 {
        self.log_counter.fetch_add(1, Ordering::Relaxed)
    }
}

/// Ancestors visible to BLOCKHASH
pub const MAX_PREV_HEADER_DEPTH: u64 = 256;

/// Header fields the block opcodes read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Beneficiary
    pub coinbase: Address,
    /// Unix time
    pub timestamp: u64,
    /// Block number
    pub number: u64,
    /// Difficulty
    pub difficulty: U256,
    /// Block gas limit
    pub gas_limit: u64,
    /// Ancestor hashes, parent first
    pub prev_hashes: Vec<H256>,
}

impl BlockContext {
    /// Hash of ancestor `block_number`, zero when outside the last 256 blocks
    pub fn ancestor_hash(&self, block_number: U256) -> H256 {
        if block_number >= U256::from(self.number) {
            return H256::ZERO;
        }
        let depth = self.number - 1 - block_number.low_u64();
        if depth >= MAX_PREV_HEADER_DEPTH {
            return H256::ZERO;
        }
        self.prev_hashes
            .get(depth as usize)
            .copied()
            .unwrap_or(H256::ZERO)
    }
}
