// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Operational configuration of a node's block cache, storage, and bootstrap pipeline.
///
/// All fields should tolerate inconsistencies across nodes without affecting the safety of the
/// protocol; they describe local resource budgets, not consensus-relevant values.
///
/// NOTE: default values should make sense, so most operators should not need to specify any field.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Parameters {
    /// Base peer count used to seed a bootstrap attempt before any scaling is applied.
    #[serde(default = "Parameters::default_bootstrap_connections")]
    pub bootstrap_connections: u32,

    /// Ceiling on the scaled connection count a large catch-up is allowed to grow to.
    #[serde(default = "Parameters::default_bootstrap_connections_max")]
    pub bootstrap_connections_max: u32,

    /// Size of the executor used for validation and I/O work. Defaults to the host's core count,
    /// floored at 4 so small machines still get enough concurrency to pipeline disk writes.
    #[serde(default = "Parameters::default_io_threads")]
    pub io_threads: u32,

    /// Capacity of the LMDB environment's named-database table, must exceed the fixed table count
    /// the storage layer opens (block, micro_block, epoch, the 32 batch_tips, ...).
    #[serde(default = "Parameters::default_lmdb_max_dbs")]
    pub lmdb_max_dbs: u32,

    /// Requests below this amount are accepted into a block but ignored by receive bookkeeping.
    #[serde(default = "Parameters::default_receive_minimum")]
    pub receive_minimum: u128,

    /// Fire-and-forget HTTP callback invoked after a block is confirmed. Empty disables it.
    #[serde(default)]
    pub callback_address: String,
    #[serde(default)]
    pub callback_port: u16,
    #[serde(default)]
    pub callback_target: String,

    /// TCP port the bootstrap server listens on for peer frontier/pull/push traffic.
    #[serde(default = "Parameters::default_peering_port")]
    pub peering_port: u16,

    /// The database path. Must be set for the node to be able to boot.
    pub db_path: Option<PathBuf>,
}

impl Parameters {
    pub fn default_bootstrap_connections() -> u32 {
        4
    }

    pub fn default_bootstrap_connections_max() -> u32 {
        64
    }

    pub fn default_io_threads() -> u32 {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4)
            .max(4)
    }

    pub fn default_lmdb_max_dbs() -> u32 {
        128
    }

    /// 1 Lgs, the network's base unit, expressed in its smallest denomination.
    pub fn default_receive_minimum() -> u128 {
        1_000_000_000_000_000_000
    }

    pub fn default_peering_port_live() -> u16 {
        7075
    }

    pub fn default_peering_port_test() -> u16 {
        54000
    }

    pub fn default_peering_port() -> u16 {
        Self::default_peering_port_live()
    }

    pub fn db_path_str_unsafe(&self) -> String {
        self.db_path
            .clone()
            .expect("DB path is not set")
            .as_path()
            .to_str()
            .unwrap()
            .to_string()
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            bootstrap_connections: Parameters::default_bootstrap_connections(),
            bootstrap_connections_max: Parameters::default_bootstrap_connections_max(),
            io_threads: Parameters::default_io_threads(),
            lmdb_max_dbs: Parameters::default_lmdb_max_dbs(),
            receive_minimum: Parameters::default_receive_minimum(),
            callback_address: String::new(),
            callback_port: 0,
            callback_target: String::new(),
            peering_port: Parameters::default_peering_port(),
            db_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_configuration_table() {
        let params = Parameters::default();
        assert_eq!(params.bootstrap_connections, 4);
        assert_eq!(params.bootstrap_connections_max, 64);
        assert!(params.io_threads >= 4);
        assert_eq!(params.lmdb_max_dbs, 128);
        assert_eq!(params.peering_port, 7075);
        assert!(params.callback_address.is_empty());
    }
}
