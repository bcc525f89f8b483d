// SPDX-License-Identifier: Apache-2.0

//! Persistence handlers, one per block kind. The core calls `VerifyAggSignature`,
//! `VerifyContent`, `BlockExists`, and `ApplyUpdates` but never implements their full semantics
//! (token rules, staking, representative accounting) — those stay with whatever collaborator
//! constructs the handler.

use logos_storage::{Store, WriteTxn};
use logos_types::{EpochBlock, Hash, MicroBlock, RequestBlock, ValidationStatus};

use crate::error::ConsensusResult;

/// One persistence handler per block kind `B`. Three independent implementations of this single
/// capability replace the original's three handler classes behind a common base-class pointer.
pub trait PersistenceHandler<B>: Send + Sync {
    /// Delegates to the aggregate-signature verification capability. Idempotent, pure with
    /// respect to storage.
    fn verify_agg_signature(&self, block: &B) -> bool;

    /// Structural and state-dependent check against current storage. `progress` resumes a
    /// retry mid-block instead of re-checking requests already applied on a prior pass.
    fn verify_content(&self, block: &B, progress: u32) -> (bool, ValidationStatus);

    /// True iff the hash is already durably committed (the write queue separately tracks
    /// in-flight writes; this only answers for what's on disk).
    fn block_exists(&self, hash: &Hash) -> ConsensusResult<bool>;

    /// Applies the block's effects inside an already-open write transaction. Must be infallible
    /// by the time a block reaches the write queue: only blocks that passed
    /// `verify_agg_signature` and `verify_content` are ever enqueued.
    fn apply_updates(&self, txn: &mut WriteTxn<'_>, block: &B) -> ConsensusResult<()>;
}

pub type RequestBlockHandler = dyn PersistenceHandler<RequestBlock>;
pub type MicroBlockHandler = dyn PersistenceHandler<MicroBlock>;
pub type EpochBlockHandler = dyn PersistenceHandler<EpochBlock>;

/// A pass-through persistence handler that accepts everything and writes blocks through
/// verbatim. Used by unit tests to exercise the write queue / pending container / block cache
/// pipeline independently of real signature and content-verification key material — the direct
/// analogue of the original's `unit_test_q` escape hatch on the write queue.
pub struct NoopRequestBlockHandler {
    pub store: std::sync::Arc<Store>,
}

impl PersistenceHandler<RequestBlock> for NoopRequestBlockHandler {
    fn verify_agg_signature(&self, _block: &RequestBlock) -> bool {
        true
    }

    fn verify_content(&self, _block: &RequestBlock, _progress: u32) -> (bool, ValidationStatus) {
        (true, ValidationStatus::ok())
    }

    fn block_exists(&self, hash: &Hash) -> ConsensusResult<bool> {
        let txn = self.store.begin_read()?;
        Ok(self.store.block_exists(&txn, hash)?)
    }

    fn apply_updates(&self, txn: &mut WriteTxn<'_>, block: &RequestBlock) -> ConsensusResult<()> {
        self.store.put_request_block(txn, block)?;
        if let Ok(delegate) = logos_config::DelegateId::try_from(block.primary_delegate) {
            self.store.put_batch_tip(
                txn,
                delegate,
                block.epoch_number,
                &logos_types::Tip::new(block.epoch_number, block.sequence, block.hash()),
            )?;
        }
        Ok(())
    }
}

pub struct NoopMicroBlockHandler {
    pub store: std::sync::Arc<Store>,
}

impl PersistenceHandler<MicroBlock> for NoopMicroBlockHandler {
    fn verify_agg_signature(&self, _block: &MicroBlock) -> bool {
        true
    }

    fn verify_content(&self, _block: &MicroBlock, _progress: u32) -> (bool, ValidationStatus) {
        (true, ValidationStatus::ok())
    }

    fn block_exists(&self, hash: &Hash) -> ConsensusResult<bool> {
        let txn = self.store.begin_read()?;
        Ok(self.store.block_exists(&txn, hash)?)
    }

    fn apply_updates(&self, txn: &mut WriteTxn<'_>, block: &MicroBlock) -> ConsensusResult<()> {
        self.store.put_micro_block(txn, block)?;
        self.store
            .put_micro_block_tip(txn, block.epoch_number, &logos_types::Tip::new(block.epoch_number, block.sequence, block.hash()))?;
        Ok(())
    }
}

pub struct NoopEpochBlockHandler {
    pub store: std::sync::Arc<Store>,
}

impl PersistenceHandler<EpochBlock> for NoopEpochBlockHandler {
    fn verify_agg_signature(&self, _block: &EpochBlock) -> bool {
        true
    }

    fn verify_content(&self, _block: &EpochBlock, _progress: u32) -> (bool, ValidationStatus) {
        (true, ValidationStatus::ok())
    }

    fn block_exists(&self, hash: &Hash) -> ConsensusResult<bool> {
        let txn = self.store.begin_read()?;
        Ok(self.store.block_exists(&txn, hash)?)
    }

    fn apply_updates(&self, txn: &mut WriteTxn<'_>, block: &EpochBlock) -> ConsensusResult<()> {
        self.store.put_epoch_block(txn, block)?;
        self.store.put_epoch_tip(
            txn,
            block.epoch_number,
            &logos_types::Tip::new(block.epoch_number, block.sequence, block.hash()),
        )?;
        Ok(())
    }
}
