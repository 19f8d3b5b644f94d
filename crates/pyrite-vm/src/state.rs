//! What a computation runs against: account state, block header and fork rules

use crate::error::VmResult;
use crate::fork::{ChainConfig, Fork, ForkSpec};
use crate::message::BlockContext;
use pyrite_db::{AccountState, ChangesetId};

/// Execution environment for one call tree.
///
/// Only one call tree may run against an account state at a time.
pub struct VmState<'a> {
    account_db: &'a mut dyn AccountState,
    block: BlockContext,
    spec: &'static ForkSpec,
}

impl<'a> VmState<'a> {
    /// Environment for `block`, with the fork picked from `chain`
    pub fn new(account_db: &'a mut dyn AccountState, block: BlockContext, chain: &ChainConfig) -> Self {
        let fork = chain.fork_at(block.number);
        Self::with_fork(account_db, block, fork)
    }

    /// Environment with an explicit fork
    pub fn with_fork(account_db: &'a mut dyn AccountState, block: BlockContext, fork: Fork) -> Self {
        Self {
            account_db,
            block,
            spec: fork.spec(),
        }
    }

    /// Account state
    pub fn account_db(&self) -> &dyn AccountState {
        &*self.account_db
    }

    /// Mutable account state
    pub fn account_db_mut(&mut self) -> &mut dyn AccountState {
        &mut *self.account_db
    }

    /// Current block
    pub fn block(&self) -> &BlockContext {
        &self.block
    }

    /// Active fork rules
    pub fn spec(&self) -> &'static ForkSpec {
        self.spec
    }

    /// Open a state snapshot
    pub fn snapshot(&mut self) -> ChangesetId {
        let changeset = self.account_db.record();
        tracing::trace!(?changeset, "snapshot");
        changeset
    }

    /// Undo everything since `changeset`
    pub fn revert(&mut self, changeset: ChangesetId) -> VmResult<()> {
        tracing::debug!(?changeset, "revert snapshot");
        Ok(self.account_db.discard(changeset)?)
    }

    /// Keep everything since `changeset`
    pub fn commit(&mut self, changeset: ChangesetId) -> VmResult<()> {
        tracing::trace!(?changeset, "commit snapshot");
        Ok(self.account_db.commit(changeset)?)
    }
}
