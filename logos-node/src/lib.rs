// SPDX-License-Identifier: Apache-2.0

//! Ambient stack binding the block cache and validation pipeline (`logos-core`) to a real
//! process: CLI parsing, layered config loading, a prometheus registry, and the TCP listener for
//! inbound bootstrap traffic. Mirrors the shape `authority_node.rs` gives the rest of its
//! surrounding node binary.

pub mod cli;
pub mod config;
pub mod listener;
pub mod node;
