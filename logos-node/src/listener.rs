// SPDX-License-Identifier: Apache-2.0

//! Accepts inbound bootstrap connections on `Parameters::peering_port` and dispatches each to the
//! right `logos_core::bootstrap_server` handler by the header's `message_type`, the server-side
//! counterpart to `bootstrap_attempt`'s client connections.

use std::sync::Arc;

use logos_config::EpochCommittee;
use logos_core::{
    handle_bulk_pull, handle_bulk_push, handle_frontier_req, message_type, BlockCache,
    BulkPullPayload, FrontierReqPayload, Header,
};
use logos_storage::Store;
use tokio::net::{TcpListener, TcpStream};

/// Runs forever, accepting connections and spawning one task per connection. Errors on an
/// individual connection are logged and dropped; they never bring down the listener.
pub async fn serve(
    listener: TcpListener,
    store: Arc<Store>,
    committee: Arc<EpochCommittee>,
    cache: Arc<BlockCache>,
) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(%err, "failed to accept bootstrap connection");
                continue;
            }
        };
        let store = store.clone();
        let committee = committee.clone();
        let cache = cache.clone();
        logos_core::spawn_monitored("bootstrap-server-connection", async move {
            if let Err(err) = handle_connection(socket, &store, &committee, &cache).await {
                tracing::warn!(%err, %peer, "bootstrap connection ended with an error");
            }
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    store: &Store,
    committee: &EpochCommittee,
    cache: &Arc<BlockCache>,
) -> logos_core::ConsensusResult<()> {
    let header = Header::read(&mut socket).await?;
    match header.message_type {
        message_type::FRONTIER_REQ => {
            let payload = FrontierReqPayload::read(&mut socket).await?;
            handle_frontier_req(store, committee, &payload, &mut socket).await
        }
        message_type::BULK_PULL => {
            let payload = BulkPullPayload::read(&mut socket).await?;
            handle_bulk_pull(store, &payload, &mut socket).await
        }
        message_type::BULK_PUSH => {
            handle_bulk_push(cache, &mut socket).await.map(|_| ())
        }
        other => Err(logos_core::ConsensusError::UnexpectedFrameType(other)),
    }
}
