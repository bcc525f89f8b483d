// SPDX-License-Identifier: Apache-2.0

//! Client side of bootstrap: exchange frontiers with a peer, turn the per-delegate comparisons
//! into pull/push work, and drain that work through a small pool of connections.
//!
//! Structured the way `commit_syncer.rs` structures its own catch-up scheduler: a shared,
//! immutable `Inner` (what every fetch task needs) plus scheduler-only mutable state (`JoinSet`,
//! pending/in-flight bookkeeping) driven by a `tokio::select!` loop. Connection I/O is abstracted
//! behind `PeerDialer` so the scheduling logic is testable against an in-memory duplex pipe
//! instead of a real socket, the same way `commit_syncer`'s tests drive a `FakeNetworkClient`.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use logos_config::DelegateId;
use logos_storage::Store;
use logos_types::Hash;

use crate::block_cache::{AddResult, BlockCache};
use crate::bootstrap_pool::{classify_retry, eviction_round_size, target_connection_count, PullRetryDecision};
use crate::bootstrap_server::{handle_bulk_pull, handle_bulk_push};
use crate::chain_walk::{reconstruct_range, AnyOwnedBlock};
use crate::context::Context;
use crate::error::{ConsensusError, ConsensusResult};
use crate::frontier::{classify, ChainRange, FrontierOutcome, LocalFrontier, PullRequest, PushRequest};
use crate::wire::{
    message_type, BulkPullPayload, FrontierReqPayload, FrontierResponse, Header, PullFrame,
};
use logos_types::ChainKind;

pub type PeerId = SocketAddr;

/// Opens connections to peers. Implemented for real sockets by `logos-node`; tests supply an
/// in-memory stand-in, the same role `FakeNetworkClient` plays for `CommitSyncer`.
#[async_trait]
pub trait PeerDialer: Send + Sync + 'static {
    type Connection: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn dial(&self, peer: PeerId) -> ConsensusResult<Self::Connection>;
}

/// A real TCP dialer, used by the node binary.
pub struct TcpDialer;

#[async_trait]
impl PeerDialer for TcpDialer {
    type Connection = tokio::net::TcpStream;

    async fn dial(&self, peer: PeerId) -> ConsensusResult<Self::Connection> {
        tokio::net::TcpStream::connect(peer)
            .await
            .map_err(|_| ConsensusError::ConnectionClosed)
    }
}

/// Outcome of draining one bootstrap attempt to completion. A failed attempt logs this summary
/// and lets the next periodic attempt retry.
#[derive(Clone, Debug, Default)]
pub struct BootstrapSummary {
    pub blocks_pulled: u64,
    pub blocks_pushed: u64,
    pub pulls_abandoned: u64,
    pub peers_evicted: u64,
}

/// Builds this node's `LocalFrontier` for one delegate out of the epoch/micro/batch tip tables.
pub fn local_frontier(
    store: &Store,
    txn: &logos_storage::ReadTxn<'_>,
    epoch_number: u32,
    delegate: DelegateId,
) -> ConsensusResult<LocalFrontier> {
    let epoch_tip = store.get_epoch_tip(txn, epoch_number)?;
    let micro_tip = store.get_micro_block_tip(txn, epoch_number)?;
    let batch_tip = store.get_batch_tip(txn, delegate, epoch_number)?;
    Ok(LocalFrontier {
        epoch_tip: epoch_tip.map(|t| t.digest).unwrap_or(Hash::ZERO),
        micro_tip: micro_tip.map(|t| t.digest).unwrap_or(Hash::ZERO),
        batch_block_tip: batch_tip.map(|t| t.digest).unwrap_or(Hash::ZERO),
        epoch_seq: epoch_tip.map(|t| t.sequence).unwrap_or(0),
        micro_seq: micro_tip.map(|t| t.sequence).unwrap_or(0),
        batch_seq: batch_tip.map(|t| t.sequence).unwrap_or(0),
    })
}

/// Sends a `frontier_req` over `conn` and classifies the `nr_delegate` responses against this
/// node's own frontiers.
async fn exchange_frontier<C: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut C,
    store: &Store,
    epoch_number: u32,
) -> ConsensusResult<Vec<FrontierOutcome>> {
    Header::new(message_type::FRONTIER_REQ).write(conn).await?;
    FrontierReqPayload {
        start: [0u8; 32],
        age: 0,
        count: 0,
        nr_delegate: logos_config::NUM_DELEGATES as u32,
    }
    .write(conn)
    .await?;

    let txn = store.begin_read()?;
    let mut outcomes = Vec::with_capacity(logos_config::NUM_DELEGATES);
    for delegate in DelegateId::all() {
        let response = FrontierResponse::read(conn).await?;
        let local = local_frontier(store, &txn, epoch_number, delegate)?;
        outcomes.push(classify(local, &response, delegate));
    }
    Ok(outcomes)
}

/// Result of running one pull to completion.
struct PullOutcome {
    blocks: u64,
    bytes: u64,
    /// Whether the stream ran to the requested tip cleanly: the connection is reused iff the
    /// last hash seen matches `end_transmission()`; otherwise it's dropped.
    reusable: bool,
}

fn chain_range_payload(pull: &PullRequest) -> BulkPullPayload {
    BulkPullPayload {
        start: [0u8; 32],
        end: Hash::ZERO,
        timestamp_start: 0,
        timestamp_end: 0,
        delegate_id: pull.delegate_id.value() as i32,
        seq_start: pull.batch.start_seq,
        seq_end: pull.batch.end_seq,
        e_start: pull.epoch.start,
        e_end: pull.epoch.end,
        m_start: pull.micro.start,
        m_end: pull.micro.end,
        b_start: pull.batch.start,
        b_end: pull.batch.end,
    }
}

/// Executes one pull: sends `bulk_pull`, reads the three NotABlock-terminated segments the
/// server sends, and feeds every block into the cache via `add_*`.
async fn run_pull<C: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut C,
    pull: &PullRequest,
    cache: &Arc<BlockCache>,
    metrics: &crate::metrics::Metrics,
) -> ConsensusResult<PullOutcome> {
    let payload = chain_range_payload(pull);
    Header::new(message_type::BULK_PULL).write(conn).await?;
    payload.write(conn).await?;

    let mut blocks = 0u64;
    let mut bytes = 0u64;
    let mut last_hash = Hash::ZERO;

    for _segment in 0..3 {
        loop {
            match PullFrame::read(conn).await? {
                PullFrame::NotABlock => break,
                PullFrame::Epoch(b) => {
                    last_hash = b.hash();
                    bytes += bcs::to_bytes(&b).map(|v| v.len() as u64).unwrap_or(0);
                    if matches!(cache.add_epoch_block(b), AddResult::Ok) {
                        blocks += 1;
                        metrics.bootstrap_blocks_received.with_label_values(&["epoch"]).inc();
                    }
                }
                PullFrame::Micro(b) => {
                    last_hash = b.hash();
                    bytes += bcs::to_bytes(&b).map(|v| v.len() as u64).unwrap_or(0);
                    if matches!(cache.add_micro_block(b), AddResult::Ok) {
                        blocks += 1;
                        metrics.bootstrap_blocks_received.with_label_values(&["micro"]).inc();
                    }
                }
                PullFrame::Batch(b) => {
                    last_hash = b.hash();
                    bytes += bcs::to_bytes(&b).map(|v| v.len() as u64).unwrap_or(0);
                    if matches!(cache.add_request_block(pull.delegate_id, b), AddResult::Ok) {
                        blocks += 1;
                        metrics.bootstrap_blocks_received.with_label_values(&["batch"]).inc();
                    }
                }
            }
        }
    }

    let reusable = blocks == 0 || last_hash == payload.end_transmission();
    Ok(PullOutcome { blocks, bytes, reusable })
}

/// Executes one push: walks the local store for each of the three chain ranges and streams the
/// reconstructed blocks as one `NotABlock`-terminated frame sequence, matching
/// `handle_bulk_push`'s single-loop read side.
async fn run_push<C: AsyncRead + AsyncWrite + Unpin>(
    conn: &mut C,
    push: &PushRequest,
    store: &Store,
) -> ConsensusResult<usize> {
    Header::new(message_type::BULK_PUSH).write(conn).await?;

    let txn = store.begin_read()?;
    let mut sent = 0usize;
    for (kind, range) in [
        (ChainKind::EpochBlock, &push.epoch),
        (ChainKind::MicroBlock, &push.micro),
        (ChainKind::RequestBlock, &push.batch),
    ] {
        let Some(blocks) = reconstruct_range(store, &txn, kind, range.start, range.end) else {
            tracing::warn!(?kind, "push source chain corrupted mid-walk, skipping");
            continue;
        };
        for block in blocks {
            let frame = match block {
                AnyOwnedBlock::Epoch(b) => PullFrame::Epoch(b),
                AnyOwnedBlock::Micro(b) => PullFrame::Micro(b),
                AnyOwnedBlock::Request(b) => PullFrame::Batch(b),
            };
            frame.write(conn).await?;
            sent += 1;
        }
    }
    PullFrame::NotABlock.write(conn).await?;
    Ok(sent)
}

/// Per-peer running stats kept only long enough to decide retry/eviction, not persisted.
struct PeerStats {
    opened: Instant,
    blocks: AtomicU64,
    bytes: AtomicU64,
}

impl PeerStats {
    fn new() -> Self {
        Self {
            opened: Instant::now(),
            blocks: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    fn record(&self, blocks: u64, bytes: u64) {
        self.blocks.fetch_add(blocks, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn too_slow(&self) -> bool {
        crate::bootstrap_pool::is_peer_too_slow(
            self.opened.elapsed(),
            self.blocks.load(Ordering::Relaxed),
            self.bytes.load(Ordering::Relaxed),
        )
    }
}

/// One bootstrap attempt: a frontier exchange against a chosen peer, followed by draining the
/// resulting pulls and then pushes through a small connection pool that grows and shrinks with
/// the pending-pull count around `bootstrap_connections`.
pub struct BootstrapAttempt<D: PeerDialer> {
    dialer: Arc<D>,
    context: Arc<Context>,
    cache: Arc<BlockCache>,
    peers: Vec<PeerId>,
}

impl<D: PeerDialer> BootstrapAttempt<D> {
    pub fn new(dialer: Arc<D>, context: Arc<Context>, cache: Arc<BlockCache>, peers: Vec<PeerId>) -> Self {
        Self { dialer, context, cache, peers }
    }

    /// Runs the frontier exchange against the first reachable peer, then drains the resulting
    /// pull queue and push queue to completion (or exhaustion of retries).
    pub async fn run(self) -> BootstrapSummary {
        let mut summary = BootstrapSummary::default();
        let Some(frontier_peer) = self.peers.first().copied() else {
            tracing::warn!("bootstrap attempt has no peers configured, skipping");
            return summary;
        };

        let outcomes = match self.dialer.dial(frontier_peer).await {
            Ok(mut conn) => {
                match exchange_frontier(&mut conn, &self.context.store, self.context.committee.epoch()).await {
                    Ok(outcomes) => outcomes,
                    Err(e) => {
                        tracing::warn!(error = %e, "frontier exchange failed");
                        return summary;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, peer = %frontier_peer, "could not reach frontier peer");
                return summary;
            }
        };

        let mut pulls = VecDeque::new();
        let mut pushes = VecDeque::new();
        for outcome in outcomes {
            match outcome {
                FrontierOutcome::InSync => {}
                FrontierOutcome::Pull(p) => pulls.push_back(p),
                FrontierOutcome::Push(p) => pushes.push_back(p),
                FrontierOutcome::Inconsistent => {
                    tracing::warn!("inconsistent frontier comparison, ignoring delegate");
                }
            }
        }

        self.drain_pulls(pulls, frontier_peer, &mut summary).await;
        self.drain_pushes(pushes, &mut summary).await;
        summary
    }

    async fn drain_pulls(
        &self,
        mut pending: VecDeque<PullRequest>,
        frontier_peer: PeerId,
        summary: &mut BootstrapSummary,
    ) {
        let peer_stats: Arc<Mutex<Vec<(PeerId, Arc<PeerStats>)>>> = Arc::new(Mutex::new(Vec::new()));
        // Peers dropped by an eviction round: excluded from future peer selection so an evicted
        // peer can't be redialed on the very next iteration.
        let excluded_peers: Arc<Mutex<HashSet<PeerId>>> = Arc::new(Mutex::new(HashSet::new()));
        // Idle connections that finished a pull cleanly, kept as a LIFO stack: popping from the
        // back means the connection that *just* finished (usually the fastest peer) is reused
        // first, keeping the fastest peer hot.
        let idle: Arc<Mutex<Vec<(PeerId, D::Connection)>>> = Arc::new(Mutex::new(Vec::new()));
        type PullJoinResult<C> = (PullRequest, PeerId, ConsensusResult<(PullOutcome, Option<C>)>);
        let mut in_flight: JoinSet<PullJoinResult<D::Connection>> = JoinSet::new();

        loop {
            let target = target_connection_count(
                self.context.parameters.bootstrap_connections,
                self.context.parameters.bootstrap_connections_max,
                pending.len(),
            );
            self.context
                .metrics
                .bootstrap_active_connections
                .with_label_values(&["pull"])
                .set(in_flight.len() as i64);

            while in_flight.len() < target as usize {
                let Some(pull) = pending.pop_front() else { break };

                let reused = {
                    let excluded = excluded_peers.lock().await;
                    let mut guard = idle.lock().await;
                    // Drop (don't reuse) idle connections to peers excluded since they were
                    // parked; keep popping until a usable one surfaces or the stack is empty.
                    loop {
                        match guard.pop() {
                            Some((peer, conn)) if !excluded.contains(&peer) => break Some((peer, conn)),
                            Some(_) => continue,
                            None => break None,
                        }
                    }
                };
                let (peer, existing_conn) = match reused {
                    Some((peer, conn)) => (peer, Some(conn)),
                    None => {
                        let excluded = excluded_peers.lock().await;
                        let mut peers: Vec<PeerId> =
                            self.peers.iter().copied().filter(|p| !excluded.contains(p)).collect();
                        drop(excluded);
                        peers.shuffle(&mut rand::thread_rng());
                        let peer = peers.into_iter().find(|p| *p != frontier_peer).unwrap_or(frontier_peer);
                        (peer, None)
                    }
                };

                let dialer = self.dialer.clone();
                let cache = self.cache.clone();
                let context = self.context.clone();
                in_flight.spawn(async move {
                    let result = async {
                        let mut conn = match existing_conn {
                            Some(conn) => conn,
                            None => dialer.dial(peer).await?,
                        };
                        let outcome = run_pull(&mut conn, &pull, &cache, &context.metrics).await?;
                        let reuse = outcome.reusable;
                        Ok::<_, ConsensusError>((outcome, reuse.then_some(conn)))
                    }
                    .await;
                    (pull, peer, result)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let Ok((mut pull, peer, result)) = joined else {
                continue;
            };

            match result {
                Ok((outcome, conn)) => {
                    summary.blocks_pulled += outcome.blocks;
                    let stats = {
                        let mut guard = peer_stats.lock().await;
                        let entry = guard.iter().find(|(p, _)| *p == peer).map(|(_, s)| s.clone());
                        entry.unwrap_or_else(|| {
                            let s = Arc::new(PeerStats::new());
                            guard.push((peer, s.clone()));
                            s
                        })
                    };
                    stats.record(outcome.blocks, outcome.bytes);

                    // An eviction round only runs once more than 2/3 of the target connection
                    // count is active; `eviction_round_size` returns 0 below that watermark, so
                    // a lone slow peer among a mostly-idle pool isn't dropped prematurely.
                    let evicting_this_round = eviction_round_size(in_flight.len(), target) > 0;
                    if stats.too_slow() && evicting_this_round {
                        let mut excluded = excluded_peers.lock().await;
                        if excluded.insert(peer) {
                            summary.peers_evicted += 1;
                            self.context
                                .metrics
                                .bootstrap_peers_evicted_total
                                .with_label_values(&["slow"])
                                .inc();
                        }
                        // Don't return an evicted peer's connection to the idle pool even if the
                        // stream itself finished cleanly.
                    } else if let Some(conn) = conn {
                        idle.lock().await.push((peer, conn));
                    }
                }
                Err(_) => match classify_retry(pull.attempts) {
                    PullRetryDecision::RetryOrdinary => {
                        pull.attempts += 1;
                        pending.push_back(pull);
                    }
                    PullRetryDecision::RedirectToFrontierPeer => {
                        pull.attempts += 1;
                        let dialer = self.dialer.clone();
                        let cache = self.cache.clone();
                        let context = self.context.clone();
                        in_flight.spawn(async move {
                            let result = async {
                                let mut conn = dialer.dial(frontier_peer).await?;
                                let outcome = run_pull(&mut conn, &pull, &cache, &context.metrics).await?;
                                Ok::<_, ConsensusError>((outcome, None))
                            }
                            .await;
                            (pull, frontier_peer, result)
                        });
                    }
                    PullRetryDecision::Abandon => {
                        summary.pulls_abandoned += 1;
                        tracing::warn!(delegate = %pull.delegate_id, "abandoning pull after exhausting retries");
                    }
                },
            }

            if pending.is_empty() && in_flight.is_empty() {
                break;
            }
        }
    }

    async fn drain_pushes(&self, mut pending: VecDeque<PushRequest>, summary: &mut BootstrapSummary) {
        let mut in_flight: JoinSet<ConsensusResult<usize>> = JoinSet::new();
        let target = target_connection_count(
            self.context.parameters.bootstrap_connections,
            self.context.parameters.bootstrap_connections_max,
            pending.len(),
        );

        while !pending.is_empty() || !in_flight.is_empty() {
            while in_flight.len() < target as usize {
                let Some(push) = pending.pop_front() else { break };
                let Some(peer) = self.peers.first().copied() else { break };
                let dialer = self.dialer.clone();
                let store = self.context.store.clone();
                in_flight.spawn(async move {
                    let mut conn = dialer.dial(peer).await?;
                    run_push(&mut conn, &push, &store).await
                });
            }
            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            match joined {
                Ok(Ok(sent)) => summary.blocks_pushed += sent as u64,
                Ok(Err(e)) => tracing::warn!(error = %e, "push failed"),
                Err(e) => tracing::warn!(error = %e, "push task panicked"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos_config::{ConsensusPublicKey, Delegate, EciesPublicKey, EpochCommittee, NUM_DELEGATES};
    use logos_types::{RequestBlock, Tip};
    use tempfile::TempDir;

    fn committee() -> EpochCommittee {
        let delegates = (0..NUM_DELEGATES)
            .map(|i| Delegate {
                account: [i as u8; 32],
                consensus_pubkey: ConsensusPublicKey([0u8; 96]),
                ecies_pubkey: EciesPublicKey([0u8; 65]),
                vote_weight: 1,
                stake: 1,
                starting_term: 0,
            })
            .collect();
        EpochCommittee::new(0, delegates)
    }

    #[test]
    fn local_frontier_defaults_to_zero_with_no_tips() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let txn = store.begin_read().unwrap();
        let frontier = local_frontier(&store, &txn, 0, DelegateId::try_from(0u8).unwrap()).unwrap();
        assert_eq!(frontier.epoch_tip, Hash::ZERO);
        assert_eq!(frontier.batch_seq, 0);
    }

    #[test]
    fn local_frontier_reflects_stored_batch_tip() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let d0 = DelegateId::try_from(0u8).unwrap();
        let tip = Tip::new(0, 7, Hash([3u8; 32]));
        let mut wtxn = store.begin_write().unwrap();
        store.put_batch_tip(&mut wtxn, d0, 0, &tip).unwrap();
        wtxn.commit().unwrap();

        let txn = store.begin_read().unwrap();
        let frontier = local_frontier(&store, &txn, 0, d0).unwrap();
        assert_eq!(frontier.batch_seq, 7);
        assert_eq!(frontier.batch_block_tip, Hash([3u8; 32]));
    }

    #[tokio::test]
    async fn frontier_exchange_round_trips_over_a_duplex_pipe() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let committee = committee();

        let (mut client, mut server) = tokio::io::duplex(1 << 16);
        let server_task = tokio::spawn(async move {
            let header = Header::read(&mut server).await.unwrap();
            assert_eq!(header.message_type, message_type::FRONTIER_REQ);
            let payload = FrontierReqPayload::read(&mut server).await.unwrap();
            for id in 0..payload.nr_delegate {
                let response = FrontierResponse {
                    timestamp_start: 0,
                    timestamp_end: 0,
                    delegate_id: id as i32,
                    epoch_tip: Hash::ZERO,
                    micro_tip: Hash::ZERO,
                    batch_block_tip: Hash([9u8; 32]),
                    epoch_block_seq_number: 0,
                    micro_block_seq_number: 0,
                    batch_block_seq_number: 3,
                };
                response.write(&mut server).await.unwrap();
            }
        });

        let outcomes = exchange_frontier(&mut client, &store, committee.epoch()).await.unwrap();
        server_task.await.unwrap();

        assert_eq!(outcomes.len(), NUM_DELEGATES);
        assert!(matches!(outcomes[0], FrontierOutcome::Pull(_)));
    }

    #[tokio::test]
    async fn run_pull_feeds_blocks_into_cache_and_reports_reusable() {
        let context = Arc::new(Context::new_for_test(committee()));
        let cache = BlockCache::new(
            context.clone(),
            crate::write_queue::WriteQueueHandles {
                request: Arc::new(crate::persistence::NoopRequestBlockHandler { store: context.store.clone() }),
                micro: Arc::new(crate::persistence::NoopMicroBlockHandler { store: context.store.clone() }),
                epoch: Arc::new(crate::persistence::NoopEpochBlockHandler { store: context.store.clone() }),
            },
        );

        let block = RequestBlock {
            epoch_number: 0,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            requests: vec![],
        };
        let tip = block.hash();

        let (mut client, mut server) = tokio::io::duplex(1 << 16);
        let server_task = tokio::spawn(async move {
            let _header = Header::read(&mut server).await.unwrap();
            let _payload = BulkPullPayload::read(&mut server).await.unwrap();
            PullFrame::NotABlock.write(&mut server).await.unwrap();
            PullFrame::NotABlock.write(&mut server).await.unwrap();
            PullFrame::Batch(block).write(&mut server).await.unwrap();
            PullFrame::NotABlock.write(&mut server).await.unwrap();
        });

        let pull = PullRequest {
            delegate_id: DelegateId::try_from(0u8).unwrap(),
            epoch: ChainRange::default(),
            micro: ChainRange::default(),
            batch: ChainRange { start: Hash::ZERO, end: tip, start_seq: 0, end_seq: 1 },
            attempts: 0,
        };

        let outcome = run_pull(&mut client, &pull, &cache, &context.metrics).await.unwrap();
        server_task.await.unwrap();

        assert_eq!(outcome.blocks, 1);
        assert!(outcome.reusable);
    }
}
