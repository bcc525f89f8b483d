// SPDX-License-Identifier: Apache-2.0

//! Organizes cached (not-yet-committed) blocks by epoch and delegate, tracks cross-block
//! dependencies, and hands out the next block ready for validation.
//!
//! Stable-index coordinates (`Coord`) replace the original's pointer-graph `ChainPtr`: every
//! waiter and every `hash_dependency_table` entry stores `(epoch_index, kind, slot_index)`
//! instead of a reference into an arena, so deletion is O(1) and there are no reference cycles.
//!
//! Lock order, always acquired in this sequence when more than one is needed: `chains`,
//! `cached_blocks`, `hash_dependency_table`. The per-block lock is innermost, held only for the
//! duration of one validate attempt, and is never held across a suspension point.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use logos_config::{DelegateId, NUM_DELEGATES};
use logos_types::{ChainKind, Coord, EpochBlock, Hash, MicroBlock, RequestBlock, ValidationStatus};

/// Capacity of the recent-writes ring. Exists to resolve the race where a validator is about to
/// register a dependency on a hash that commits concurrently: if the hash is here, the
/// dependency insert is dropped and the caller retries immediately instead of waiting forever.
const RECENT_WRITES_CAPACITY: usize = 512;

#[derive(Default)]
struct BlockState {
    status: ValidationStatus,
    dependencies: HashSet<Hash>,
}

pub struct PendingBlock<T> {
    pub block: T,
    pub direct_write: bool,
    state: Mutex<BlockState>,
    /// Acquired for the duration of one validate attempt; gates concurrent workers, independent
    /// of `state`'s own lock, which only needs to be held for the instant of a read or mutation.
    lock: AtomicBool,
}

impl<T> PendingBlock<T> {
    fn new(block: T, direct_write: bool) -> Self {
        Self {
            block,
            direct_write,
            state: Mutex::new(BlockState::default()),
            lock: AtomicBool::new(false),
        }
    }

    /// Returns true if the lock was free and is now held by the caller.
    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn unlock(&self) {
        self.lock.store(false, Ordering::SeqCst);
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::SeqCst)
    }

    fn is_ready(&self) -> bool {
        self.state.lock().dependencies.is_empty()
    }

    fn status(&self) -> ValidationStatus {
        self.state.lock().status.clone()
    }

    fn set_status(&self, status: ValidationStatus, dependencies: HashSet<Hash>) {
        let mut guard = self.state.lock();
        guard.status = status;
        guard.dependencies = dependencies;
    }

    /// Removes `hash` from the dependency set. Returns true if the set thereby became empty.
    fn clear_dependency(&self, hash: &Hash) -> bool {
        let mut guard = self.state.lock();
        guard.dependencies.remove(hash);
        guard.dependencies.is_empty()
    }
}

struct EpochPeriod {
    eb: Option<PendingBlock<EpochBlock>>,
    mbs: BTreeMap<u32, PendingBlock<MicroBlock>>,
    rbs: [BTreeMap<u32, PendingBlock<RequestBlock>>; NUM_DELEGATES],
    /// Next RB sequence expected per delegate; advances when a block is handed to the write
    /// queue, not when it durably commits, so the scanner sees chain-order progress immediately.
    rb_next_seq: [u32; NUM_DELEGATES],
    mb_next_seq: u32,
    /// Set once the MB carrying `last_micro_block = true` has been handed to the write queue.
    mb_chain_closed: bool,
    eb_handed_off: bool,
}

impl EpochPeriod {
    fn new() -> Self {
        Self {
            eb: None,
            mbs: BTreeMap::new(),
            rbs: std::array::from_fn(|_| BTreeMap::new()),
            rb_next_seq: [0; NUM_DELEGATES],
            mb_next_seq: 0,
            mb_chain_closed: false,
            eb_handed_off: false,
        }
    }
}

struct HashDependencyState {
    /// For each unresolved hash, the blocks blocked on it.
    waiters: HashMap<Hash, Vec<Coord>>,
    recent_writes: VecDeque<Hash>,
    recent_writes_set: HashSet<Hash>,
}

impl HashDependencyState {
    fn new() -> Self {
        Self {
            waiters: HashMap::new(),
            recent_writes: VecDeque::with_capacity(RECENT_WRITES_CAPACITY),
            recent_writes_set: HashSet::with_capacity(RECENT_WRITES_CAPACITY),
        }
    }

    fn push_recent_write(&mut self, hash: Hash) {
        if self.recent_writes_set.insert(hash) {
            self.recent_writes.push_back(hash);
            if self.recent_writes.len() > RECENT_WRITES_CAPACITY {
                if let Some(evicted) = self.recent_writes.pop_front() {
                    self.recent_writes_set.remove(&evicted);
                }
            }
        }
    }
}

pub struct PendingBlockContainer {
    chains: RwLock<BTreeMap<u32, EpochPeriod>>,
    cached_blocks: RwLock<HashMap<Hash, Coord>>,
    hash_dependency_table: RwLock<HashDependencyState>,
}

impl Default for PendingBlockContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingBlockContainer {
    pub fn new() -> Self {
        Self {
            chains: RwLock::new(BTreeMap::new()),
            cached_blocks: RwLock::new(HashMap::new()),
            hash_dependency_table: RwLock::new(HashDependencyState::new()),
        }
    }

    pub fn is_block_cached(&self, hash: &Hash) -> bool {
        self.cached_blocks.read().contains_key(hash)
    }

    /// True iff `hash` was committed recently enough to still be in the ring buffer. Callers use
    /// this to avoid registering a dependency on a hash that has already resolved.
    pub fn is_recently_written(&self, hash: &Hash) -> bool {
        self.hash_dependency_table
            .read()
            .recent_writes_set
            .contains(hash)
    }

    fn ensure_period(chains: &mut BTreeMap<u32, EpochPeriod>, epoch_number: u32) -> &mut EpochPeriod {
        chains.entry(epoch_number).or_insert_with(EpochPeriod::new)
    }

    /// Inserts a request block into the correct epoch/delegate slot. Returns `true` if this is
    /// the first time the block's hash has been seen (the caller should report `Ok`/accepted);
    /// `false` means the hash was already cached (the caller should report `Exists`).
    pub fn add_request_block(
        &self,
        delegate: DelegateId,
        block: RequestBlock,
        verified: bool,
    ) -> bool {
        let hash = block.hash();
        let mut chains = self.chains.write();
        let mut cached = self.cached_blocks.write();
        if cached.contains_key(&hash) {
            return false;
        }
        let epoch_number = block.epoch_number;
        let sequence = block.sequence;
        let period = Self::ensure_period(&mut chains, epoch_number);
        let epoch_index = epoch_number as usize;
        period.rbs[usize::from(delegate)].insert(sequence, PendingBlock::new(block, verified));
        cached.insert(hash, Coord::request(epoch_index, delegate, sequence));
        true
    }

    pub fn add_micro_block(&self, block: MicroBlock, verified: bool) -> bool {
        let hash = block.hash();
        let mut chains = self.chains.write();
        let mut cached = self.cached_blocks.write();
        if cached.contains_key(&hash) {
            return false;
        }
        let epoch_number = block.epoch_number;
        let sequence = block.sequence;
        let period = Self::ensure_period(&mut chains, epoch_number);
        let epoch_index = epoch_number as usize;
        period.mbs.insert(sequence, PendingBlock::new(block, verified));
        cached.insert(hash, Coord::micro(epoch_index, sequence));
        true
    }

    pub fn add_epoch_block(&self, block: EpochBlock, verified: bool) -> bool {
        let hash = block.hash();
        let mut chains = self.chains.write();
        let mut cached = self.cached_blocks.write();
        if cached.contains_key(&hash) {
            return false;
        }
        let epoch_number = block.epoch_number;
        let sequence = block.sequence;
        let period = Self::ensure_period(&mut chains, epoch_number);
        // At most one EB per EpochPeriod.
        if period.eb.is_some() || period.eb_handed_off {
            return false;
        }
        let epoch_index = epoch_number as usize;
        period.eb = Some(PendingBlock::new(block, verified));
        cached.insert(hash, Coord::epoch(epoch_index, sequence));
        true
    }

    /// True once the epoch's EB has been handed off to the write queue: an EB terminates its
    /// epoch and no further MBs or RBs of that epoch are accepted afterward.
    pub fn is_epoch_closed(&self, epoch_number: u32) -> bool {
        self.chains
            .read()
            .get(&epoch_number)
            .map(|p| p.eb_handed_off)
            .unwrap_or(false)
    }

    /// Inserts into `hash_dependency_table` unless `hash` is already in `recent_DB_writes`, in
    /// which case no dependency is added: the caller should retry immediately instead, which
    /// resolves the race described in the concurrency model (a concurrent committer may have
    /// finished and drained any waiters before this insert would have landed).
    pub fn add_hash_dependency(&self, hash: Hash, waiter: Coord) -> bool {
        let mut state = self.hash_dependency_table.write();
        if state.recent_writes_set.contains(&hash) {
            return false;
        }
        state.waiters.entry(hash).or_default().push(waiter);
        true
    }

    /// Locks the block at `coord` for exclusive validation. Returns `None` if the slot is empty
    /// (already committed/deleted), `Some(false)` if another worker already holds the lock.
    pub fn try_lock(&self, coord: Coord) -> Option<bool> {
        let chains = self.chains.read();
        let period = chains.get(&(coord.epoch_index as u32))?;
        match coord.kind {
            ChainKind::RequestBlock => period.rbs[usize::from(coord.slot_index?)]
                .get(&coord.sequence)
                .map(|b| b.try_lock()),
            ChainKind::MicroBlock => period.mbs.get(&coord.sequence).map(|b| b.try_lock()),
            ChainKind::EpochBlock => period.eb.as_ref().map(|b| b.try_lock()),
        }
    }

    pub fn unlock(&self, coord: Coord) {
        let chains = self.chains.read();
        let Some(period) = chains.get(&(coord.epoch_index as u32)) else {
            return;
        };
        match coord.kind {
            ChainKind::RequestBlock => {
                if let Some(slot) = coord.slot_index {
                    if let Some(b) = period.rbs[usize::from(slot)].get(&coord.sequence) {
                        b.unlock();
                    }
                }
            }
            ChainKind::MicroBlock => {
                if let Some(b) = period.mbs.get(&coord.sequence) {
                    b.unlock();
                }
            }
            ChainKind::EpochBlock => {
                if let Some(b) = period.eb.as_ref() {
                    b.unlock();
                }
            }
        }
    }

    pub fn status(&self, coord: Coord) -> Option<ValidationStatus> {
        let chains = self.chains.read();
        let period = chains.get(&(coord.epoch_index as u32))?;
        match coord.kind {
            ChainKind::RequestBlock => period.rbs[usize::from(coord.slot_index?)]
                .get(&coord.sequence)
                .map(|b| b.status()),
            ChainKind::MicroBlock => period.mbs.get(&coord.sequence).map(|b| b.status()),
            ChainKind::EpochBlock => period.eb.as_ref().map(|b| b.status()),
        }
    }

    pub fn set_status(&self, coord: Coord, status: ValidationStatus, dependencies: HashSet<Hash>) {
        let chains = self.chains.read();
        let Some(period) = chains.get(&(coord.epoch_index as u32)) else {
            return;
        };
        match coord.kind {
            ChainKind::RequestBlock => {
                if let Some(slot) = coord.slot_index {
                    if let Some(b) = period.rbs[usize::from(slot)].get(&coord.sequence) {
                        b.set_status(status, dependencies);
                    }
                }
            }
            ChainKind::MicroBlock => {
                if let Some(b) = period.mbs.get(&coord.sequence) {
                    b.set_status(status, dependencies);
                }
            }
            ChainKind::EpochBlock => {
                if let Some(b) = period.eb.as_ref() {
                    b.set_status(status, dependencies);
                }
            }
        }
    }

    pub fn is_direct_write(&self, coord: Coord) -> bool {
        let chains = self.chains.read();
        let Some(period) = chains.get(&(coord.epoch_index as u32)) else {
            return false;
        };
        match coord.kind {
            ChainKind::RequestBlock => coord
                .slot_index
                .and_then(|slot| period.rbs[usize::from(slot)].get(&coord.sequence))
                .map(|b| b.direct_write)
                .unwrap_or(false),
            ChainKind::MicroBlock => period
                .mbs
                .get(&coord.sequence)
                .map(|b| b.direct_write)
                .unwrap_or(false),
            ChainKind::EpochBlock => period
                .eb
                .as_ref()
                .map(|b| b.direct_write)
                .unwrap_or(false),
        }
    }

    pub fn request_block_at(&self, coord: Coord) -> Option<RequestBlock> {
        let chains = self.chains.read();
        let period = chains.get(&(coord.epoch_index as u32))?;
        Some(period.rbs[usize::from(coord.slot_index?)].get(&coord.sequence)?.block.clone())
    }

    pub fn micro_block_at(&self, coord: Coord) -> Option<MicroBlock> {
        let chains = self.chains.read();
        let period = chains.get(&(coord.epoch_index as u32))?;
        Some(period.mbs.get(&coord.sequence)?.block.clone())
    }

    pub fn epoch_block_at(&self, coord: Coord) -> Option<EpochBlock> {
        let chains = self.chains.read();
        let period = chains.get(&(coord.epoch_index as u32))?;
        Some(period.eb.as_ref()?.block.clone())
    }

    /// Removes the block at `coord` from the structural map and `cached_blocks`, advances the
    /// chain's sequence counter, and returns the owned block so the caller can hand it to the
    /// write queue. Called once a block has passed verification and is about to be enqueued.
    pub fn mark_intent_to_write(&self, coord: Coord) -> Option<AnyBlockTaken> {
        let mut chains = self.chains.write();
        let mut cached = self.cached_blocks.write();
        let period = chains.get_mut(&(coord.epoch_index as u32))?;
        let taken = match coord.kind {
            ChainKind::RequestBlock => {
                let slot = coord.slot_index?;
                let pending = period.rbs[usize::from(slot)].remove(&coord.sequence)?;
                period.rb_next_seq[usize::from(slot)] = coord.sequence + 1;
                cached.remove(&pending.block.hash());
                AnyBlockTaken::Request(pending.block)
            }
            ChainKind::MicroBlock => {
                let pending = period.mbs.remove(&coord.sequence)?;
                period.mb_next_seq = coord.sequence + 1;
                if pending.block.last_micro_block {
                    period.mb_chain_closed = true;
                }
                cached.remove(&pending.block.hash());
                AnyBlockTaken::Micro(pending.block)
            }
            ChainKind::EpochBlock => {
                let pending = period.eb.take()?;
                period.eb_handed_off = true;
                cached.remove(&pending.block.hash());
                AnyBlockTaken::Epoch(pending.block)
            }
        };
        Some(taken)
    }

    /// Drains `hash_dependency_table[hash]`, clears each waiter's matching entry from its
    /// dependency set, and returns the coords of waiters that thereby became ready. Pushes
    /// `hash` onto `recent_DB_writes`. For request blocks the same resolution is repeated for
    /// each inner request's own hash, since other blocks may depend on those, not just the
    /// enclosing block's hash.
    pub fn mark_as_validated(&self, committed: &AnyBlockTaken) -> Vec<Coord> {
        let mut ready = Vec::new();
        {
            let mut state = self.hash_dependency_table.write();
            state.push_recent_write(committed.hash());
        }
        ready.extend(self.resolve_waiters(committed.hash()));
        if let AnyBlockTaken::Request(rb) = committed {
            for request in &rb.requests {
                ready.extend(self.resolve_waiters(request.hash));
            }
        }
        ready
    }

    fn resolve_waiters(&self, hash: Hash) -> Vec<Coord> {
        let waiters = {
            let mut state = self.hash_dependency_table.write();
            state.waiters.remove(&hash)
        };
        let Some(waiters) = waiters else {
            return Vec::new();
        };
        let mut ready = Vec::new();
        for coord in waiters {
            if self.clear_dependency(coord, &hash) {
                ready.push(coord);
            }
        }
        ready
    }

    fn clear_dependency(&self, coord: Coord, hash: &Hash) -> bool {
        let chains = self.chains.read();
        let Some(period) = chains.get(&(coord.epoch_index as u32)) else {
            return false;
        };
        match coord.kind {
            ChainKind::RequestBlock => coord
                .slot_index
                .and_then(|slot| period.rbs[usize::from(slot)].get(&coord.sequence))
                .map(|rb| rb.clear_dependency(hash))
                .unwrap_or(false),
            ChainKind::MicroBlock => period
                .mbs
                .get(&coord.sequence)
                .map(|mb| mb.clear_dependency(hash))
                .unwrap_or(false),
            ChainKind::EpochBlock => period
                .eb
                .as_ref()
                .map(|eb| eb.clear_dependency(hash))
                .unwrap_or(false),
        }
    }

    /// Removes a definitively bad block and frees the dependency edges pointing to it, without
    /// marking its waiters ready — their dependency is unsatisfiable and they stay blocked until
    /// their enclosing chain eventually collects them.
    pub fn block_delete(&self, hash: &Hash) {
        let mut chains = self.chains.write();
        let mut cached = self.cached_blocks.write();
        let Some(coord) = cached.remove(hash) else {
            return;
        };
        if let Some(period) = chains.get_mut(&(coord.epoch_index as u32)) {
            match coord.kind {
                ChainKind::RequestBlock => {
                    if let Some(slot) = coord.slot_index {
                        period.rbs[usize::from(slot)].remove(&coord.sequence);
                    }
                }
                ChainKind::MicroBlock => {
                    period.mbs.remove(&coord.sequence);
                }
                ChainKind::EpochBlock => {
                    period.eb = None;
                }
            }
        }
        self.hash_dependency_table.write().waiters.remove(hash);
    }

    /// Implements the validation scan: oldest open epoch, delegate RB streams proceeding in
    /// parallel, MB in sequence once its referenced RB tips have committed, EB once the MB chain
    /// has closed and the prior epoch's EB has been handed off. Ties between simultaneously
    /// ready blocks break by `(epoch_number, sequence, delegate_id)` ascending: every delegate's
    /// next-expected RB is collected first, and the one with the lowest `(sequence, delegate_id)`
    /// is handed out, rather than returning whichever delegate iteration reaches first (delegate
    /// 0 ready at a high sequence must not jump ahead of delegate 5 ready at a lower one).
    pub fn get_next_block(&self) -> Option<Coord> {
        let chains = self.chains.read();
        let (epoch_number, period) = chains.iter().next()?;
        let epoch_index = *epoch_number as usize;
        let prior_closed = *epoch_number == 0
            || chains
                .get(&epoch_number.saturating_sub(1))
                .map(|p| p.eb_handed_off)
                .unwrap_or(true);
        if !prior_closed {
            return None;
        }

        let mut ready_rb: Option<(u32, DelegateId)> = None;
        for delegate in DelegateId::all() {
            let seq = period.rb_next_seq[usize::from(delegate)];
            if let Some(pending) = period.rbs[usize::from(delegate)].get(&seq) {
                if pending.is_ready() && !pending.is_locked() {
                    ready_rb = match ready_rb {
                        Some((best_seq, best_delegate)) if (best_seq, best_delegate) <= (seq, delegate) => {
                            Some((best_seq, best_delegate))
                        }
                        _ => Some((seq, delegate)),
                    };
                }
            }
        }
        if let Some((seq, delegate)) = ready_rb {
            return Some(Coord::request(epoch_index, delegate, seq));
        }

        let mb_seq = period.mb_next_seq;
        if let Some(mb) = period.mbs.get(&mb_seq) {
            let tips_ready = mb
                .block
                .tips
                .iter()
                .enumerate()
                .all(|(d, tip)| tip.is_none() || tip.sequence < period.rb_next_seq[d]);
            if tips_ready && mb.is_ready() && !mb.is_locked() {
                return Some(Coord::micro(epoch_index, mb_seq));
            }
        }

        if period.mb_chain_closed {
            if let Some(eb) = period.eb.as_ref() {
                if eb.is_ready() && !eb.is_locked() {
                    return Some(Coord::epoch(epoch_index, eb.block.sequence));
                }
            }
        }

        None
    }
}

/// An owned block taken out of the container by `mark_intent_to_write`, handed to the write
/// queue verbatim.
#[derive(Clone, Debug)]
pub enum AnyBlockTaken {
    Request(RequestBlock),
    Micro(MicroBlock),
    Epoch(EpochBlock),
}

impl AnyBlockTaken {
    pub fn hash(&self) -> Hash {
        match self {
            AnyBlockTaken::Request(b) => b.hash(),
            AnyBlockTaken::Micro(b) => b.hash(),
            AnyBlockTaken::Epoch(b) => b.hash(),
        }
    }
}

impl From<AnyBlockTaken> for crate::block_kind::AnyBlock {
    fn from(taken: AnyBlockTaken) -> Self {
        match taken {
            AnyBlockTaken::Request(b) => crate::block_kind::AnyBlock::Request(b),
            AnyBlockTaken::Micro(b) => crate::block_kind::AnyBlock::Micro(b),
            AnyBlockTaken::Epoch(b) => crate::block_kind::AnyBlock::Epoch(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos_types::Tip;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn empty_tips() -> [Tip; NUM_DELEGATES] {
        std::array::from_fn(|_| Tip::NONE)
    }

    fn rb(epoch: u32, delegate: u8, seq: u32, previous: Hash) -> RequestBlock {
        RequestBlock {
            epoch_number: epoch,
            primary_delegate: delegate,
            sequence: seq,
            previous,
            requests: vec![],
        }
    }

    #[test]
    fn linear_mb_chain_reversed_arrival_commits_in_order() {
        let container = PendingBlockContainer::new();
        const N: u32 = 5;
        let mut blocks: Vec<MicroBlock> = (0..N)
            .map(|seq| MicroBlock {
                epoch_number: 0,
                primary_delegate: 0,
                sequence: seq,
                previous: Hash::ZERO,
                last_micro_block: seq + 1 == N,
                tips: empty_tips(),
                number_batch_blocks: 0,
            })
            .collect();
        blocks.reverse();
        for mb in blocks {
            assert!(container.add_micro_block(mb, true));
        }

        let mut committed_order = Vec::new();
        while let Some(coord) = container.get_next_block() {
            assert_eq!(container.try_lock(coord), Some(true));
            let taken = container.mark_intent_to_write(coord).unwrap();
            committed_order.push(taken.hash());
            container.mark_as_validated(&taken);
            container.unlock(coord);
        }
        assert_eq!(committed_order.len(), N as usize);
    }

    #[test]
    fn squared_rb_arrival_preserves_per_delegate_order() {
        let container = PendingBlockContainer::new();
        const DELEGATES: u8 = 8;
        const SEQS: u32 = 8;
        let mut all = Vec::new();
        for d in 0..DELEGATES {
            for s in 0..SEQS {
                all.push((d, s));
            }
        }
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        all.shuffle(&mut rng);
        for (d, s) in all {
            let delegate = DelegateId::try_from(d).unwrap();
            container.add_request_block(delegate, rb(0, d, s, Hash::ZERO), true);
        }

        let mut committed = 0;
        let mut last_seq_per_delegate = vec![None; DELEGATES as usize];
        while let Some(coord) = container.get_next_block() {
            assert_eq!(container.try_lock(coord), Some(true));
            let taken = container.mark_intent_to_write(coord).unwrap();
            if let AnyBlockTaken::Request(b) = &taken {
                let d = b.primary_delegate as usize;
                if let Some(prev) = last_seq_per_delegate[d] {
                    assert_eq!(b.sequence, prev + 1);
                }
                last_seq_per_delegate[d] = Some(b.sequence);
            }
            container.mark_as_validated(&taken);
            container.unlock(coord);
            committed += 1;
        }
        assert_eq!(committed, (DELEGATES as usize) * (SEQS as usize));
    }

    #[test]
    fn epoch_block_waits_for_micro_block_tip() {
        let container = PendingBlockContainer::new();
        let rb0 = rb(0, 0, 0, Hash::ZERO);
        let rb0_hash = rb0.hash();
        container.add_request_block(DelegateId::try_from(0u8).unwrap(), rb0, true);

        let mut tips = empty_tips();
        tips[0] = Tip::new(0, 0, rb0_hash);
        let mb = MicroBlock {
            epoch_number: 0,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            last_micro_block: true,
            tips,
            number_batch_blocks: 0,
        };
        let mb_hash = mb.hash();
        container.add_micro_block(mb, true);

        let eb = EpochBlock {
            epoch_number: 0,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            micro_block_tip: Tip::new(0, 0, mb_hash),
            total_rbs: 1,
            total_supply: 0,
            transaction_fee_pool: 0,
            delegates: vec![],
            is_extension: false,
        };
        container.add_epoch_block(eb, true);

        let first = container.get_next_block().unwrap();
        assert_eq!(first.kind, ChainKind::RequestBlock);
        let taken = container.mark_intent_to_write(first).unwrap();
        container.mark_as_validated(&taken);
        container.unlock(first);

        let second = container.get_next_block().unwrap();
        assert_eq!(second.kind, ChainKind::MicroBlock);
        let taken = container.mark_intent_to_write(second).unwrap();
        container.mark_as_validated(&taken);
        container.unlock(second);

        let third = container.get_next_block().unwrap();
        assert_eq!(third.kind, ChainKind::EpochBlock);
    }
}
