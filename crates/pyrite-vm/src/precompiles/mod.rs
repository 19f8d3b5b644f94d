//! Precompiled contracts
//!
//! Each precompile runs in place of bytecode when a message's code address matches. It charges
//! its own gas, reads the call data and sets the output; any error is the computation's error.

mod bn128;
mod ecrecover;
mod hash;
mod identity;
mod modexp;

use crate::computation::Computation;
use crate::error::VmError;
use crate::fork::Fork;
use pyrite_primitives::Address;
use std::collections::BTreeMap;

/// Body of a precompiled contract
pub type PrecompileFn = fn(&mut Computation) -> Result<(), VmError>;

/// Address `0x00..00{index}`
pub const fn precompile_address(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = index;
    Address::from_bytes(bytes)
}

/// ECRECOVER
pub const ECRECOVER: Address = precompile_address(1);
/// SHA256
pub const SHA256: Address = precompile_address(2);
/// RIPEMD160
pub const RIPEMD160: Address = precompile_address(3);
/// IDENTITY
pub const IDENTITY: Address = precompile_address(4);
/// MODEXP
pub const MODEXP: Address = precompile_address(5);
/// BN128 point addition
pub const ECADD: Address = precompile_address(6);
/// BN128 scalar multiplication
pub const ECMUL: Address = precompile_address(7);
/// BN128 pairing check
pub const ECPAIRING: Address = precompile_address(8);

/// Precompiles active in one fork, by address
#[derive(Clone, Default)]
pub struct PrecompileSet {
    contracts: BTreeMap<Address, PrecompileFn>,
}

impl PrecompileSet {
    /// Set active at `fork`
    pub fn for_fork(fork: Fork) -> Self {
        let mut contracts: BTreeMap<Address, PrecompileFn> = BTreeMap::new();
        contracts.insert(ECRECOVER, ecrecover::ecrecover);
        contracts.insert(SHA256, hash::sha256);
        contracts.insert(RIPEMD160, hash::ripemd160);
        contracts.insert(IDENTITY, identity::identity);
        // EIP-196, EIP-197, EIP-198
        if fork >= Fork::Byzantium {
            contracts.insert(MODEXP, modexp::modexp);
            contracts.insert(ECADD, bn128::ecadd);
            contracts.insert(ECMUL, bn128::ecmul);
            contracts.insert(ECPAIRING, bn128::ecpairing);
        }
        Self { contracts }
    }

    /// Precompile at `address`
    pub fn get(&self, address: &Address) -> Option<PrecompileFn> {
        self.contracts.get(address).copied()
    }

    /// Whether `address` is a precompile
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Active addresses, ascending
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.contracts.keys()
    }

    /// Number of precompiles
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::computation::Computation;
    use crate::fork::Fork;
    use crate::message::{BlockContext, Message, TransactionContext};
    use crate::state::VmState;
    use pyrite_db::{AccountDb, MemoryDb, BLANK_ROOT_HASH};
    use pyrite_primitives::{Address, U256};

    /// Call the precompile at `address` with `input`
    pub fn run_precompile(fork: Fork, address: Address, input: &[u8], gas: u64) -> Computation {
        let mut db = AccountDb::new(MemoryDb::new(), BLANK_ROOT_HASH);
        let mut state = VmState::with_fork(&mut db, BlockContext::default(), fork);
        let sender = Address::from_bytes([0x20; 20]);
        let msg = Message::new(gas, address, sender, U256::zero(), input.to_vec(), vec![]);
        let ctx = TransactionContext::new(U256::one(), sender);
        Computation::apply_message(&mut state, msg, ctx).unwrap()
    }
}
