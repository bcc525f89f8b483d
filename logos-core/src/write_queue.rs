// SPDX-License-Identifier: Apache-2.0

//! Single point of mutation for the block store, so concurrent validators need not coordinate
//! on storage transactions. A `tokio::sync::mpsc` channel plus a `DashSet` in-flight index
//! replace the original's condvar-guarded FIFO and hand-rolled `in_flight` set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use logos_storage::Store;
use logos_types::{EpochBlock, Hash, MicroBlock, RequestBlock, ValidationStatus};
use tokio::sync::mpsc;

use crate::block_kind::AnyBlock;
use crate::error::{ConsensusError, ConsensusResult};
use crate::metrics::Metrics;
use crate::persistence::PersistenceHandler;
use crate::task::spawn_monitored;

/// A block that has finished its write transaction, handed off so the caller can run
/// `process_dependencies` without the write queue calling back into the pending container
/// synchronously (that inversion is what prevents deadlock with a validator holding the
/// container's lock while it enqueues a block).
pub type CommittedBlock = AnyBlock;

pub struct WriteQueueHandles {
    pub request: Arc<dyn PersistenceHandler<RequestBlock>>,
    pub micro: Arc<dyn PersistenceHandler<MicroBlock>>,
    pub epoch: Arc<dyn PersistenceHandler<EpochBlock>>,
}

pub struct WriteQueue {
    sender: mpsc::UnboundedSender<AnyBlock>,
    in_flight: Arc<DashSet<Hash>>,
    poisoned: Arc<AtomicBool>,
    handles: Arc<WriteQueueHandles>,
    store: Arc<Store>,
}

impl WriteQueue {
    /// Spawns the single background writer and returns the handle used by callers to enqueue
    /// blocks. `committed_tx` receives every block after its write transaction commits.
    pub fn new(
        store: Arc<Store>,
        handles: WriteQueueHandles,
        committed_tx: mpsc::UnboundedSender<CommittedBlock>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<AnyBlock>();
        let in_flight = Arc::new(DashSet::new());
        let poisoned = Arc::new(AtomicBool::new(false));
        let handles = Arc::new(handles);

        let worker_in_flight = in_flight.clone();
        let worker_poisoned = poisoned.clone();
        let worker_handles = handles.clone();
        let worker_store = store.clone();
        spawn_monitored("write-queue-worker", async move {
            while let Some(block) = receiver.recv().await {
                let hash = block.hash();
                metrics.write_queue_depth.set(worker_in_flight.len() as i64);
                match commit(&worker_store, &worker_handles, &block) {
                    Ok(()) => {
                        metrics
                            .validation_outcomes
                            .with_label_values(&["committed"])
                            .inc();
                        if committed_tx.send(block).is_err() {
                            tracing::debug!("committed-block receiver dropped, shutting down");
                        }
                    }
                    Err(err) => {
                        tracing::error!(%err, %hash, "fatal storage error applying block, write queue is poisoned");
                        worker_poisoned.store(true, Ordering::SeqCst);
                        worker_in_flight.remove(&hash);
                        break;
                    }
                }
                worker_in_flight.remove(&hash);
            }
        });

        Self {
            sender,
            in_flight,
            poisoned,
            handles,
            store,
        }
    }

    pub fn verify_agg_signature(&self, block: &AnyBlock) -> bool {
        match block {
            AnyBlock::Request(b) => self.handles.request.verify_agg_signature(b),
            AnyBlock::Micro(b) => self.handles.micro.verify_agg_signature(b),
            AnyBlock::Epoch(b) => self.handles.epoch.verify_agg_signature(b),
        }
    }

    pub fn verify_content(&self, block: &AnyBlock, progress: u32) -> (bool, ValidationStatus) {
        match block {
            AnyBlock::Request(b) => self.handles.request.verify_content(b, progress),
            AnyBlock::Micro(b) => self.handles.micro.verify_content(b, progress),
            AnyBlock::Epoch(b) => self.handles.epoch.verify_content(b, progress),
        }
    }

    /// True iff the hash is in storage or in this queue's in-flight set.
    pub fn block_exists(&self, hash: &Hash) -> ConsensusResult<bool> {
        if self.in_flight.contains(hash) {
            return Ok(true);
        }
        let txn = self.store.begin_read()?;
        Ok(self.store.block_exists(&txn, hash)?)
    }

    /// Appends to the FIFO, inserts the hash into the in-flight set, and wakes the writer.
    pub fn store_block(&self, block: AnyBlock) -> ConsensusResult<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(ConsensusError::WriteQueuePoisoned);
        }
        self.in_flight.insert(block.hash());
        self.sender
            .send(block)
            .map_err(|_| ConsensusError::WriteQueuePoisoned)
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }
}

fn commit(
    store: &Store,
    handles: &WriteQueueHandles,
    block: &AnyBlock,
) -> ConsensusResult<()> {
    let mut txn = store.begin_write().map_err(ConsensusError::StorageFatal)?;
    match block {
        AnyBlock::Request(b) => handles.request.apply_updates(&mut txn, b)?,
        AnyBlock::Micro(b) => handles.micro.apply_updates(&mut txn, b)?,
        AnyBlock::Epoch(b) => handles.epoch.apply_updates(&mut txn, b)?,
    }
    txn.commit().map_err(ConsensusError::StorageFatal)?;
    Ok(())
}
