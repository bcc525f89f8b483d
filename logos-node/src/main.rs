// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use clap::Parser;
use logos_core::{NoopEpochBlockHandler, NoopMicroBlockHandler, NoopRequestBlockHandler, WriteQueueHandles};
use logos_node::cli::Args;
use logos_node::config;
use logos_node::node::LogosNode;
use prometheus::Registry;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut parameters = config::load_parameters(args.config.as_deref())?;
    if let Some(db_path) = args.db_path {
        parameters.db_path = Some(db_path);
    }

    let committee_path = args
        .config
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--config is required to load the committee"))?;
    let committee = config::load_committee(committee_path)?;

    let own_index = args
        .delegate_index
        .map(logos_config::DelegateId::try_from)
        .transpose()
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    let store = LogosNode::open_store(&parameters)?;
    let handles = WriteQueueHandles {
        request: Arc::new(NoopRequestBlockHandler { store: store.clone() }),
        micro: Arc::new(NoopMicroBlockHandler { store: store.clone() }),
        epoch: Arc::new(NoopEpochBlockHandler { store: store.clone() }),
    };

    let registry = Registry::new();
    let node = LogosNode::start(own_index, committee, parameters, args.peer, store, handles, &registry).await?;

    tokio::signal::ctrl_c().await?;
    node.stop().await;
    Ok(())
}
