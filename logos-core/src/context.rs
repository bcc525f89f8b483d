// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use logos_config::{DelegateId, EpochCommittee, Parameters};
use logos_storage::Store;

use crate::metrics::Metrics;

/// Per-epoch configuration and metrics shared by every component of this node's block cache
/// and validation pipeline.
#[derive(Clone)]
pub struct Context {
    /// This node's own delegate id in the current committee, if it is a delegate.
    pub own_index: Option<DelegateId>,
    pub committee: EpochCommittee,
    pub parameters: Parameters,
    pub metrics: Arc<Metrics>,
    pub store: Arc<Store>,
}

impl Context {
    pub fn new(
        own_index: Option<DelegateId>,
        committee: EpochCommittee,
        parameters: Parameters,
        metrics: Arc<Metrics>,
        store: Arc<Store>,
    ) -> Self {
        Self {
            own_index,
            committee,
            parameters,
            metrics,
            store,
        }
    }

    #[cfg(test)]
    pub fn new_for_test(committee: EpochCommittee) -> Self {
        use prometheus::Registry;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = Store::open(temp_dir.path(), 128).unwrap();
        Self {
            own_index: Some(logos_config::DelegateId::try_from(0u8).unwrap()),
            committee,
            parameters: Parameters {
                db_path: Some(temp_dir.into_path()),
                ..Default::default()
            },
            metrics: Arc::new(Metrics::new(&Registry::new())),
            store: Arc::new(store),
        }
    }
}
