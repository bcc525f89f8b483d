// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::Parser;

/// Runs a Logos node: the block cache and validation pipeline, the bootstrap client/server, and
/// whatever storage path and peer set this node was configured with.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML file overriding the default `Parameters`. Optional: a node with no file and
    /// no `LOGOS_*` environment overrides still boots against sane defaults for everything except
    /// the database path, which must be supplied one way or another.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Overrides `Parameters::db_path`. Takes precedence over the config file and environment.
    #[arg(long, value_name = "DIR")]
    pub db_path: Option<PathBuf>,

    /// This node's own delegate index within the current committee, if it is a delegate rather
    /// than a passive observer.
    #[arg(long)]
    pub delegate_index: Option<u8>,

    /// Addresses of peers to contact for the initial frontier exchange.
    #[arg(long, value_name = "ADDR", num_args = 0..)]
    pub peer: Vec<std::net::SocketAddr>,
}
