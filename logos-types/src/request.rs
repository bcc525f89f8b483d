// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use logos_config::AccountAddress;

pub type Amount = u128;

/// A single user request, opaque beyond the fields the core inspects to build the
/// per-account dependency micro-chain. Requests form per-account chains inside the RB stream:
/// `previous` points at the account's prior request (zero if this is the account's first).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub previous: Hash,
    pub origin: AccountAddress,
    pub fee: Amount,
    pub hash: Hash,
}
