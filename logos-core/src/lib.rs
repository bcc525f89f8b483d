// SPDX-License-Identifier: Apache-2.0

//! Block cache and validation pipeline: admits request/micro/epoch blocks from bootstrap or
//! p2p, holds them until their dependencies resolve, validates and commits them through a single
//! write queue, and drives the client and server sides of bootstrap catch-up.

mod block_cache;
mod block_kind;
mod bootstrap_attempt;
mod bootstrap_pool;
mod bootstrap_server;
mod chain_walk;
mod context;
mod error;
mod frontier;
mod metrics;
mod pending_container;
mod persistence;
mod task;
mod wire;
mod write_queue;

pub use block_cache::{AddResult, BlockCache};
pub use block_kind::AnyBlock;
pub use bootstrap_attempt::{
    local_frontier, BootstrapAttempt, BootstrapSummary, PeerDialer, PeerId, TcpDialer,
};
pub use bootstrap_pool::{
    classify_retry, eviction_round_size, is_peer_too_slow, target_connection_count,
    PullRetryDecision, MAX_ORDINARY_PULL_ATTEMPTS,
};
pub use bootstrap_server::{handle_bulk_pull, handle_bulk_push, handle_frontier_req};
pub use chain_walk::{reconstruct_range, AnyOwnedBlock};
pub use context::Context;
pub use error::{ConsensusError, ConsensusResult};
pub use frontier::{classify, ChainRange, FrontierOutcome, LocalFrontier, PullRequest, PushRequest};
pub use metrics::Metrics;
pub use persistence::{
    EpochBlockHandler, MicroBlockHandler, NoopEpochBlockHandler, NoopMicroBlockHandler,
    NoopRequestBlockHandler, PersistenceHandler, RequestBlockHandler,
};
pub use task::spawn_monitored;
pub use wire::{
    message_type, stream_block_type, BulkPullPayload, FrontierReqPayload, FrontierResponse,
    Header, PullFrame, CURRENT_VERSION, HEADER_LEN, MAGIC,
};
pub use write_queue::{CommittedBlock, WriteQueue, WriteQueueHandles};
