// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry,
    register_int_gauge_with_registry, IntCounterVec, IntGauge, IntGaugeVec, Registry,
};

/// Metrics shared by every component of the block cache and validation pipeline, following the
/// same `Metrics::new(registry)` construction shape the node binary uses to build its own
/// `Context`.
pub struct Metrics {
    pub cache_size: IntGauge,
    pub write_queue_depth: IntGauge,
    pub validation_outcomes: IntCounterVec,
    pub bootstrap_blocks_received: IntCounterVec,
    pub bootstrap_peers_evicted_total: IntCounterVec,
    pub bootstrap_active_connections: IntGaugeVec,
}

impl Metrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            cache_size: register_int_gauge_with_registry!(
                "logos_pending_cache_size",
                "Number of blocks currently held in the pending block container",
                registry,
            )
            .unwrap(),
            write_queue_depth: register_int_gauge_with_registry!(
                "logos_write_queue_depth",
                "Number of blocks queued for commit to storage",
                registry,
            )
            .unwrap(),
            validation_outcomes: register_int_counter_vec_with_registry!(
                "logos_validation_outcomes_total",
                "Validation outcomes by result code",
                &["result_code"],
                registry,
            )
            .unwrap(),
            bootstrap_blocks_received: register_int_counter_vec_with_registry!(
                "logos_bootstrap_blocks_received_total",
                "Blocks received from a bootstrap peer by chain kind",
                &["kind"],
                registry,
            )
            .unwrap(),
            bootstrap_peers_evicted_total: register_int_counter_vec_with_registry!(
                "logos_bootstrap_peers_evicted_total",
                "Bootstrap peers evicted by reason",
                &["reason"],
                registry,
            )
            .unwrap(),
            bootstrap_active_connections: register_int_gauge_vec_with_registry!(
                "logos_bootstrap_active_connections",
                "Active bootstrap client connections",
                &["role"],
                registry,
            )
            .unwrap(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_metrics() -> std::sync::Arc<Metrics> {
    std::sync::Arc::new(Metrics::new(&Registry::new()))
}
