// SPDX-License-Identifier: Apache-2.0

//! Top-level node wiring, mirroring `authority_node.rs`'s `AuthorityNode::start`/`stop` shape:
//! construct a `Context`, build the pipeline components on top of it, and hand back a handle
//! that owns their lifetimes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use logos_config::{DelegateId, EpochCommittee, Parameters};
use logos_core::{BlockCache, BootstrapAttempt, Context, Metrics, PeerId, TcpDialer, WriteQueueHandles};
use logos_storage::Store;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::listener;

/// How long the supervising loop waits before starting the next attempt after one finishes.
const BOOTSTRAP_PERIOD: Duration = Duration::from_secs(60);

/// How often the poison monitor polls the write queue's fatal-error flag.
const POISON_POLL_PERIOD: Duration = Duration::from_secs(1);

pub struct LogosNode {
    context: Arc<Context>,
    cache: Arc<BlockCache>,
    start_time: Instant,
    listener_handle: JoinHandle<()>,
    bootstrap_handle: JoinHandle<()>,
    poison_monitor_handle: JoinHandle<()>,
}

impl LogosNode {
    /// Opens the LMDB environment named by `parameters.db_path`. Exposed separately from
    /// `start` so a caller can open the store once, build `Store`-backed persistence handlers
    /// from it (the `Noop*` handlers `main.rs` wires in need an `Arc<Store>` themselves), and
    /// hand both the store and the handles to `start` without opening the environment twice —
    /// `Store::open` is only safe to call once per path per process.
    pub fn open_store(parameters: &Parameters) -> anyhow::Result<Arc<Store>> {
        let db_path = parameters
            .db_path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Parameters::db_path must be set before boot"))?;
        Ok(Arc::new(Store::open(db_path, parameters.lmdb_max_dbs)?))
    }

    /// Wires the write queue with the caller-supplied persistence handlers (injected at
    /// construction rather than hardcoded, so a real embedder can supply handlers backed by
    /// actual signature/content verification; `logos-node`'s own binary wires in the
    /// pass-through `Noop*` handlers since that verification is out of this crate's scope),
    /// starts the block cache, and spawns the bootstrap server listener, the periodic
    /// client-side bootstrap loop, and a monitor that exits the process if the write queue is
    /// ever poisoned by a fatal storage error.
    pub async fn start(
        own_index: Option<DelegateId>,
        committee: EpochCommittee,
        parameters: Parameters,
        peers: Vec<PeerId>,
        store: Arc<Store>,
        handles: WriteQueueHandles,
        registry: &Registry,
    ) -> anyhow::Result<Self> {
        tracing::info!(?own_index, epoch = committee.epoch(), "starting logos node");

        let metrics = Arc::new(Metrics::new(registry));
        let committee = Arc::new(committee);

        let context = Arc::new(Context::new(
            own_index,
            (*committee).clone(),
            parameters.clone(),
            metrics,
            store.clone(),
        ));

        let cache = BlockCache::new(context.clone(), handles);

        let tcp_listener = TcpListener::bind(("0.0.0.0", parameters.peering_port)).await?;
        let listener_store = store.clone();
        let listener_committee = committee.clone();
        let listener_cache = cache.clone();
        let listener_handle = logos_core::spawn_monitored("bootstrap-listener", async move {
            listener::serve(tcp_listener, listener_store, listener_committee, listener_cache).await;
        });

        let dialer = Arc::new(TcpDialer);
        let bootstrap_context = context.clone();
        let bootstrap_cache = cache.clone();
        let bootstrap_handle = logos_core::spawn_monitored("bootstrap-loop", async move {
            let mut ticker = tokio::time::interval(BOOTSTRAP_PERIOD);
            loop {
                ticker.tick().await;
                if peers.is_empty() {
                    continue;
                }
                let attempt = BootstrapAttempt::new(
                    dialer.clone(),
                    bootstrap_context.clone(),
                    bootstrap_cache.clone(),
                    peers.clone(),
                );
                let summary = attempt.run().await;
                tracing::info!(
                    blocks_pulled = summary.blocks_pulled,
                    blocks_pushed = summary.blocks_pushed,
                    pulls_abandoned = summary.pulls_abandoned,
                    peers_evicted = summary.peers_evicted,
                    "bootstrap attempt finished"
                );
            }
        });

        let poison_cache = cache.clone();
        let poison_monitor_handle = logos_core::spawn_monitored("write-queue-poison-monitor", async move {
            let mut ticker = tokio::time::interval(POISON_POLL_PERIOD);
            loop {
                ticker.tick().await;
                if poison_cache.is_poisoned() {
                    tracing::error!(
                        "write queue poisoned by a fatal storage error, terminating process"
                    );
                    std::process::exit(1);
                }
            }
        });

        Ok(Self {
            context,
            cache,
            start_time: Instant::now(),
            listener_handle,
            bootstrap_handle,
            poison_monitor_handle,
        })
    }

    pub fn cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub async fn stop(self) {
        tracing::info!(uptime = ?self.start_time.elapsed(), "stopping logos node");
        self.listener_handle.abort();
        self.bootstrap_handle.abort();
        self.poison_monitor_handle.abort();
    }
}
