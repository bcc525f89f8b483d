// SPDX-License-Identifier: Apache-2.0

//! Per-delegate frontier exchange: given our own tips/sequences for a delegate chain and a
//! peer's, decide whether we're in sync, behind (enqueue a pull), or ahead (enqueue a push).

use logos_config::DelegateId;
use logos_types::Hash;

use crate::wire::FrontierResponse;

/// This node's local view of one delegate chain's three tips, compared against a peer's
/// `FrontierResponse` for the same delegate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalFrontier {
    pub epoch_tip: Hash,
    pub micro_tip: Hash,
    pub batch_block_tip: Hash,
    pub epoch_seq: u32,
    pub micro_seq: u32,
    pub batch_seq: u32,
}

/// Range to pull from a peer for one of the three chains of one delegate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ChainRange {
    pub start: Hash,
    pub end: Hash,
    pub start_seq: u32,
    pub end_seq: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub delegate_id: DelegateId,
    pub epoch: ChainRange,
    pub micro: ChainRange,
    pub batch: ChainRange,
    pub attempts: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushRequest {
    pub delegate_id: DelegateId,
    pub epoch: ChainRange,
    pub micro: ChainRange,
    pub batch: ChainRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontierOutcome {
    InSync,
    Pull(PullRequest),
    Push(PushRequest),
    /// Sequences across the three chains are inconsistent with either a clean "behind" or
    /// "ahead" ordering; nothing is scheduled, and the caller should just log it.
    Inconsistent,
}

/// Classifies one delegate's frontier comparison. The "behind" and "ahead" inequalities are
/// intentionally asymmetric (see `DESIGN.md`) rather than tightened into a matching pair.
pub fn classify(local: LocalFrontier, peer: &FrontierResponse, delegate_id: DelegateId) -> FrontierOutcome {
    let peer_epoch_seq = peer.epoch_block_seq_number;
    let peer_micro_seq = peer.micro_block_seq_number;
    let peer_batch_seq = peer.batch_block_seq_number;

    if local.epoch_seq == peer_epoch_seq
        && local.micro_seq == peer_micro_seq
        && local.batch_seq == peer_batch_seq
    {
        return FrontierOutcome::InSync;
    }

    // Behind: note batch_seq uses a strict `<` while epoch/micro use `<=`, asymmetric on purpose.
    if local.epoch_seq <= peer_epoch_seq
        && local.micro_seq <= peer_micro_seq
        && local.batch_seq < peer_batch_seq
    {
        return FrontierOutcome::Pull(PullRequest {
            delegate_id,
            epoch: ChainRange {
                start: local.epoch_tip,
                end: peer.epoch_tip,
                start_seq: local.epoch_seq,
                end_seq: peer_epoch_seq,
            },
            micro: ChainRange {
                start: local.micro_tip,
                end: peer.micro_tip,
                start_seq: local.micro_seq,
                end_seq: peer_micro_seq,
            },
            batch: ChainRange {
                start: local.batch_block_tip,
                end: peer.batch_block_tip,
                start_seq: local.batch_seq,
                end_seq: peer_batch_seq,
            },
            attempts: 0,
        });
    }

    // Ahead: strict `>` on bsb, `>=` on epoch/micro.
    if local.batch_seq > peer_batch_seq
        && local.epoch_seq >= peer_epoch_seq
        && local.micro_seq >= peer_micro_seq
    {
        return FrontierOutcome::Push(PushRequest {
            delegate_id,
            epoch: ChainRange {
                start: peer.epoch_tip,
                end: local.epoch_tip,
                start_seq: peer_epoch_seq,
                end_seq: local.epoch_seq,
            },
            micro: ChainRange {
                start: peer.micro_tip,
                end: local.micro_tip,
                start_seq: peer_micro_seq,
                end_seq: local.micro_seq,
            },
            batch: ChainRange {
                start: peer.batch_block_tip,
                end: local.batch_block_tip,
                start_seq: peer_batch_seq,
                end_seq: local.batch_seq,
            },
        });
    }

    FrontierOutcome::Inconsistent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegate(n: u8) -> DelegateId {
        DelegateId::try_from(n).unwrap()
    }

    fn response(epoch_seq: u32, micro_seq: u32, batch_seq: u32) -> FrontierResponse {
        FrontierResponse {
            timestamp_start: 0,
            timestamp_end: 0,
            delegate_id: 0,
            epoch_tip: Hash([1u8; 32]),
            micro_tip: Hash([2u8; 32]),
            batch_block_tip: Hash([3u8; 32]),
            epoch_block_seq_number: epoch_seq,
            micro_block_seq_number: micro_seq,
            batch_block_seq_number: batch_seq,
        }
    }

    #[test]
    fn equal_sequences_are_in_sync() {
        let local = LocalFrontier {
            epoch_tip: Hash::ZERO,
            micro_tip: Hash::ZERO,
            batch_block_tip: Hash::ZERO,
            epoch_seq: 3,
            micro_seq: 2,
            batch_seq: 5,
        };
        assert_eq!(
            classify(local, &response(3, 2, 5), delegate(0)),
            FrontierOutcome::InSync
        );
    }

    #[test]
    fn behind_peer_enqueues_pull_with_peer_tip_as_end() {
        // node X (3,2,5) vs node Y (3,2,9) for delegate 0.
        let local = LocalFrontier {
            epoch_tip: Hash([10u8; 32]),
            micro_tip: Hash([11u8; 32]),
            batch_block_tip: Hash([12u8; 32]),
            epoch_seq: 3,
            micro_seq: 2,
            batch_seq: 5,
        };
        let peer = response(3, 2, 9);
        match classify(local, &peer, delegate(0)) {
            FrontierOutcome::Pull(pull) => {
                assert_eq!(pull.batch.start_seq, 5);
                assert_eq!(pull.batch.end_seq, 9);
                assert_eq!(pull.batch.end, peer.batch_block_tip);
            }
            other => panic!("expected Pull, got {other:?}"),
        }
    }

    #[test]
    fn ahead_of_peer_enqueues_push() {
        let local = LocalFrontier {
            epoch_tip: Hash::ZERO,
            micro_tip: Hash::ZERO,
            batch_block_tip: Hash([9u8; 32]),
            epoch_seq: 3,
            micro_seq: 2,
            batch_seq: 9,
        };
        let peer = response(3, 2, 5);
        match classify(local, &peer, delegate(0)) {
            FrontierOutcome::Push(push) => {
                assert_eq!(push.batch.start_seq, 5);
                assert_eq!(push.batch.end_seq, 9);
            }
            other => panic!("expected Push, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_ordering_is_reported_and_ignored() {
        let local = LocalFrontier {
            epoch_tip: Hash::ZERO,
            micro_tip: Hash::ZERO,
            batch_block_tip: Hash::ZERO,
            epoch_seq: 5,
            micro_seq: 1,
            batch_seq: 5,
        };
        let peer = response(3, 2, 5);
        assert_eq!(
            classify(local, &peer, delegate(0)),
            FrontierOutcome::Inconsistent
        );
    }
}
