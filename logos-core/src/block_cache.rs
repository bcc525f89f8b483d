// SPDX-License-Identifier: Apache-2.0

//! The public façade: `add_*`/`store_*` admit blocks from bootstrap/p2p and the local consensus
//! path respectively, `process_dependencies` is invoked by the write queue after every commit,
//! and the validate loop is the actual re-validation scan driven from it.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock, Weak};

use logos_config::DelegateId;
use logos_types::{ChainKind, Coord, EpochBlock, Hash, MicroBlock, RequestBlock, ResultCode, ValidationStatus};

use crate::block_kind::AnyBlock;
use crate::context::Context;
use crate::error::ConsensusResult;
use crate::pending_container::{AnyBlockTaken, PendingBlockContainer};
use crate::task::spawn_monitored;
use crate::write_queue::{WriteQueue, WriteQueueHandles};

/// Outcome of an `add_*`/`store_*` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddResult {
    /// Signature or irreparable content check failed, or the block arrived for an epoch whose
    /// EB has already committed.
    Failed,
    /// Already in storage, in the write queue, in the cache, or in the recent-writes ring.
    Exists,
    /// Accepted into the cache; validation proceeds asynchronously.
    Ok,
}

pub struct BlockCache {
    container: Arc<PendingBlockContainer>,
    write_queue: Arc<WriteQueue>,
    context: Arc<Context>,
    weak_self: OnceLock<Weak<BlockCache>>,
}

impl BlockCache {
    pub fn new(context: Arc<Context>, handles: WriteQueueHandles) -> Arc<Self> {
        let container = Arc::new(PendingBlockContainer::new());
        let (committed_tx, mut committed_rx) = tokio::sync::mpsc::unbounded_channel();
        let write_queue = Arc::new(WriteQueue::new(
            context.store.clone(),
            handles,
            committed_tx,
            context.metrics.clone(),
        ));
        let cache = Arc::new(Self {
            container,
            write_queue,
            context,
            weak_self: OnceLock::new(),
        });
        let _ = cache.weak_self.set(Arc::downgrade(&cache));

        let dispatch_cache = cache.clone();
        spawn_monitored("block-cache-dependency-dispatch", async move {
            while let Some(committed) = committed_rx.recv().await {
                dispatch_cache.process_dependencies(committed);
            }
        });
        cache
    }

    pub fn is_block_cached(&self, hash: &Hash) -> bool {
        self.container.is_block_cached(hash)
    }

    /// True once the underlying write queue has hit a fatal storage error. The supervising
    /// binary treats this as fatal and exits rather than continuing to admit blocks it can
    /// never durably commit.
    pub fn is_poisoned(&self) -> bool {
        self.write_queue.is_poisoned()
    }

    fn already_present(&self, hash: &Hash) -> ConsensusResult<bool> {
        Ok(self.container.is_block_cached(hash)
            || self.container.is_recently_written(hash)
            || self.write_queue.block_exists(hash)?)
    }

    pub fn add_request_block(&self, delegate: DelegateId, block: RequestBlock) -> AddResult {
        self.insert_request_block(delegate, block, false)
    }

    pub fn store_request_block(&self, delegate: DelegateId, block: RequestBlock) -> AddResult {
        self.insert_request_block(delegate, block, true)
    }

    fn insert_request_block(
        &self,
        delegate: DelegateId,
        block: RequestBlock,
        verified: bool,
    ) -> AddResult {
        let hash = block.hash();
        match self.already_present(&hash) {
            Ok(true) => return AddResult::Exists,
            Err(_) => return AddResult::Failed,
            Ok(false) => {}
        }
        if self.container.is_epoch_closed(block.epoch_number) {
            return AddResult::Failed;
        }
        if self.container.add_request_block(delegate, block, verified) {
            self.context.metrics.cache_size.inc();
            self.wake();
            AddResult::Ok
        } else {
            AddResult::Exists
        }
    }

    pub fn add_micro_block(&self, block: MicroBlock) -> AddResult {
        self.insert_micro_block(block, false)
    }

    pub fn store_micro_block(&self, block: MicroBlock) -> AddResult {
        self.insert_micro_block(block, true)
    }

    fn insert_micro_block(&self, block: MicroBlock, verified: bool) -> AddResult {
        let hash = block.hash();
        match self.already_present(&hash) {
            Ok(true) => return AddResult::Exists,
            Err(_) => return AddResult::Failed,
            Ok(false) => {}
        }
        if self.container.is_epoch_closed(block.epoch_number) {
            return AddResult::Failed;
        }
        if self.container.add_micro_block(block, verified) {
            self.context.metrics.cache_size.inc();
            self.wake();
            AddResult::Ok
        } else {
            AddResult::Exists
        }
    }

    pub fn add_epoch_block(&self, block: EpochBlock) -> AddResult {
        self.insert_epoch_block(block, false)
    }

    pub fn store_epoch_block(&self, block: EpochBlock) -> AddResult {
        self.insert_epoch_block(block, true)
    }

    fn insert_epoch_block(&self, block: EpochBlock, verified: bool) -> AddResult {
        let hash = block.hash();
        match self.already_present(&hash) {
            Ok(true) => return AddResult::Exists,
            Err(_) => return AddResult::Failed,
            Ok(false) => {}
        }
        if self.container.add_epoch_block(block, verified) {
            self.context.metrics.cache_size.inc();
            self.wake();
            AddResult::Ok
        } else {
            AddResult::Exists
        }
    }

    /// Read-only pre-check used by the (out-of-scope) transaction acceptor before admission.
    /// Never opens a write transaction — only ever a read guard on the container and storage.
    /// `epoch_num` is the epoch the caller intends to place this request in; a request aimed at
    /// an already-closed epoch is rejected the same way a late RB/MB would be.
    pub fn validate_request(&self, request: &logos_types::Request, epoch_num: u32) -> (bool, ResultCode) {
        if self.container.is_epoch_closed(epoch_num) {
            return (false, ResultCode::Old);
        }
        match self.already_present(&request.hash) {
            Ok(true) => (false, ResultCode::Exists),
            Ok(false) => (true, ResultCode::Progress),
            Err(_) => (false, ResultCode::BadSignature),
        }
    }

    /// Invoked by the write queue after a successful commit: marks the hash (and, for RBs, every
    /// inner request hash) as validated, then wakes the scan so every newly-unblocked waiter is
    /// picked up.
    pub fn process_dependencies(self: &Arc<Self>, committed: AnyBlockTaken) {
        self.context
            .metrics
            .validation_outcomes
            .with_label_values(&["committed"])
            .inc();
        self.context.metrics.cache_size.dec();
        let ready = self.container.mark_as_validated(&committed);
        if !ready.is_empty() {
            self.wake();
        }
    }

    /// Spawns (another copy of) the validate loop. The container scan is global and stateless
    /// and the per-block lock keeps at most one worker live on any given block, so redundant
    /// spawns triggered by concurrent `add_*`/commits are harmless — just a bit of wasted
    /// scanning, never duplicate writes.
    fn wake(&self) {
        let Some(weak) = self.weak_self.get() else {
            return;
        };
        if let Some(cache) = weak.upgrade() {
            spawn_validate_loop(cache);
        }
    }
}

/// Spawns the validate loop as a background task.
pub fn spawn_validate_loop(cache: Arc<BlockCache>) {
    spawn_monitored("block-cache-validate", async move {
        run_validate_loop(cache).await;
    });
}

async fn run_validate_loop(cache: Arc<BlockCache>) {
    loop {
        let Some(coord) = cache.container.get_next_block() else {
            return;
        };
        match cache.container.try_lock(coord) {
            Some(true) => {}
            _ => return,
        }
        validate_one(&cache, coord).await;
    }
}

async fn validate_one(cache: &Arc<BlockCache>, coord: Coord) {
    if cache.container.is_direct_write(coord) {
        if let Some(taken) = cache.container.mark_intent_to_write(coord) {
            enqueue(cache, taken);
        }
        cache.container.unlock(coord);
        return;
    }

    let Some(block) = load_block(cache, coord) else {
        cache.container.unlock(coord);
        return;
    };

    if !cache.write_queue.verify_agg_signature(&block) {
        cache.container.block_delete(&block.hash());
        cache.container.unlock(coord);
        return;
    }

    let progress = cache
        .container
        .status(coord)
        .map(|s| s.progress)
        .unwrap_or(0);
    let (ok, status) = cache.write_queue.verify_content(&block, progress);
    if ok {
        if let Some(taken) = cache.container.mark_intent_to_write(coord) {
            enqueue(cache, taken);
        }
        cache.container.unlock(coord);
        return;
    }

    if status.reason.map(|r| r.is_gap_like()).unwrap_or(false) {
        let deps = gap_dependencies(&block, &status);
        let mut accepted: HashSet<Hash> = HashSet::new();
        let mut already_resolved = false;
        for dep in &deps {
            if cache.container.add_hash_dependency(*dep, coord) {
                accepted.insert(*dep);
            } else {
                already_resolved = true;
            }
        }
        if already_resolved {
            // One of the dependencies committed concurrently (the recent_DB_writes race);
            // retry immediately instead of parking on an edge that will never fire.
            let (ok2, status2) = cache.write_queue.verify_content(&block, progress);
            if ok2 {
                if let Some(taken) = cache.container.mark_intent_to_write(coord) {
                    enqueue(cache, taken);
                }
                cache.container.unlock(coord);
                return;
            }
            cache.container.set_status(coord, status2, accepted);
        } else {
            cache.container.set_status(coord, status, accepted);
        }
    } else {
        cache.container.block_delete(&block.hash());
    }
    cache.container.unlock(coord);
}

fn enqueue(cache: &Arc<BlockCache>, taken: AnyBlockTaken) {
    let block: AnyBlock = taken.into();
    if let Err(err) = cache.write_queue.store_block(block) {
        tracing::error!(%err, "failed to enqueue validated block to write queue");
    }
}

fn load_block(cache: &Arc<BlockCache>, coord: Coord) -> Option<AnyBlock> {
    match coord.kind {
        ChainKind::RequestBlock => cache.container.request_block_at(coord).map(AnyBlock::Request),
        ChainKind::MicroBlock => cache.container.micro_block_at(coord).map(AnyBlock::Micro),
        ChainKind::EpochBlock => cache.container.epoch_block_at(coord).map(AnyBlock::Epoch),
    }
}

/// The hashes a gap-like `ValidationStatus` says this block is waiting on: the block's own
/// `previous` for a `GapPrevious`/no-per-request detail, or each gapped request's `previous` for
/// `GapSource`/`InvalidRequest` with per-request detail.
fn gap_dependencies(block: &AnyBlock, status: &ValidationStatus) -> HashSet<Hash> {
    let mut deps = HashSet::new();
    if let AnyBlock::Request(rb) = block {
        for (idx, code) in &status.per_request_results {
            if code.is_gap_like() {
                if let Some(req) = rb.requests.get(*idx as usize) {
                    deps.insert(req.previous);
                }
            }
        }
    }
    if deps.is_empty() {
        deps.insert(block.previous());
    }
    deps
}
