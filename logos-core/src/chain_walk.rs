// SPDX-License-Identifier: Apache-2.0

//! Shared range-reconstruction helper used by both the bootstrap server (serving a requested
//! range) and the bootstrap client's push path (walking its own chain to build the blocks it
//! pushes). Storage only links a block to its predecessor, so both directions are built the same
//! way: walk `previous` pointers backward from the newer tip until reaching the older tip (or the
//! chain root, if none was given), then reverse to get oldest-to-newest streaming order.

use logos_storage::{ReadTxn, Store};
use logos_types::{ChainKind, EpochBlock, Hash, MicroBlock, RequestBlock};

#[derive(Clone, Debug)]
pub enum AnyOwnedBlock {
    Request(RequestBlock),
    Micro(MicroBlock),
    Epoch(EpochBlock),
}

/// Reconstructs the range `(start, end]` of one chain, oldest-first. If `start == end` and both
/// are non-zero, walks all the way back to the chain root (digest `Hash::ZERO` previous) instead
/// — the "give me everything I don't have" shorthand a client uses when it only knows its own
/// tip. Returns `None` if a hash in the middle of the chain is missing from storage (corruption):
/// the caller resets that chain's cursor to zero and moves on instead of aborting.
pub fn reconstruct_range(
    store: &Store,
    txn: &ReadTxn<'_>,
    kind: ChainKind,
    start: Hash,
    end: Hash,
) -> Option<Vec<AnyOwnedBlock>> {
    if end.is_zero() {
        return Some(Vec::new());
    }
    let stop_at = if start == end { Hash::ZERO } else { start };

    let mut out = Vec::new();
    let mut cursor = end;
    while !cursor.is_zero() && cursor != stop_at {
        let block = match kind {
            ChainKind::EpochBlock => store
                .get_epoch_block(txn, &cursor)
                .ok()?
                .map(AnyOwnedBlock::Epoch),
            ChainKind::MicroBlock => store
                .get_micro_block(txn, &cursor)
                .ok()?
                .map(AnyOwnedBlock::Micro),
            ChainKind::RequestBlock => store
                .get_request_block(txn, &cursor)
                .ok()?
                .map(AnyOwnedBlock::Request),
        };
        let Some(block) = block else {
            // Chain corruption: the hash we expected to find isn't in storage. The caller treats
            // this as "reset the cursor and skip the chain" rather than erroring the connection.
            return None;
        };
        cursor = block.previous();
        out.push(block);
    }
    out.reverse();
    Some(out)
}

impl AnyOwnedBlock {
    pub fn previous(&self) -> Hash {
        match self {
            AnyOwnedBlock::Request(b) => b.previous,
            AnyOwnedBlock::Micro(b) => b.previous,
            AnyOwnedBlock::Epoch(b) => b.previous,
        }
    }

    pub fn hash(&self) -> Hash {
        match self {
            AnyOwnedBlock::Request(b) => b.hash(),
            AnyOwnedBlock::Micro(b) => b.hash(),
            AnyOwnedBlock::Epoch(b) => b.hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rb(seq: u32, previous: Hash) -> RequestBlock {
        RequestBlock {
            epoch_number: 0,
            primary_delegate: 0,
            sequence: seq,
            previous,
            requests: vec![],
        }
    }

    #[test]
    fn whole_chain_walk_stops_at_zero() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let mut prev = Hash::ZERO;
        let mut hashes = Vec::new();
        let mut wtxn = store.begin_write().unwrap();
        for seq in 0..4 {
            let block = rb(seq, prev);
            prev = block.hash();
            hashes.push(prev);
            store.put_request_block(&mut wtxn, &block).unwrap();
        }
        wtxn.commit().unwrap();

        let rtxn = store.begin_read().unwrap();
        let tip = *hashes.last().unwrap();
        let chain = reconstruct_range(&store, &rtxn, ChainKind::RequestBlock, tip, tip).unwrap();
        assert_eq!(chain.len(), 4);
        assert_eq!(chain[0].hash(), hashes[0]);
        assert_eq!(chain[3].hash(), tip);
    }

    #[test]
    fn partial_range_excludes_start() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let mut prev = Hash::ZERO;
        let mut hashes = Vec::new();
        let mut wtxn = store.begin_write().unwrap();
        for seq in 0..4 {
            let block = rb(seq, prev);
            prev = block.hash();
            hashes.push(prev);
            store.put_request_block(&mut wtxn, &block).unwrap();
        }
        wtxn.commit().unwrap();

        let rtxn = store.begin_read().unwrap();
        let chain = reconstruct_range(
            &store,
            &rtxn,
            ChainKind::RequestBlock,
            hashes[1],
            hashes[3],
        )
        .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].hash(), hashes[2]);
        assert_eq!(chain[1].hash(), hashes[3]);
    }

    #[test]
    fn missing_hash_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let rtxn = store.begin_read().unwrap();
        let dangling = Hash([42u8; 32]);
        assert!(reconstruct_range(&store, &rtxn, ChainKind::RequestBlock, Hash::ZERO, dangling)
            .is_none());
    }
}
