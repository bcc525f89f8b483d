// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a `ResultCode` should be handled by the validate loop once it's returned from
/// `verify_content`. Queried via `ResultCode::propagation_policy` rather than re-matched at
/// every call site — this is the only taxonomy this crate licenses turning into an abstraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropagationPolicy {
    /// Block accepted; continue (or: silently drop, not an error).
    Drop,
    /// Recoverable: park the block in the cache and register a dependency.
    Recoverable,
    /// Fatal for this block: delete it, leave its dependents unsatisfiable.
    Fatal,
    /// Transient: caller may retry after a backoff.
    Transient,
}

/// The full result taxonomy a persistence handler's `VerifyContent`/`ApplyUpdates` can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    Progress,
    Old,
    Exists,
    Pending,
    Initializing,
    AlreadyReserved,
    GapPrevious,
    GapSource,
    InvalidRequest,
    BadSignature,
    InvalidBlockType,
    BlockPosition,
    BalanceMismatch,
    Fork,
    NegativeSpend,
}

impl ResultCode {
    pub fn propagation_policy(&self) -> PropagationPolicy {
        use PropagationPolicy::*;
        use ResultCode::*;
        match self {
            Progress | Old | Exists => Drop,
            GapPrevious | GapSource | InvalidRequest => Recoverable,
            BadSignature | InvalidBlockType | BlockPosition | BalanceMismatch | Fork
            | NegativeSpend => Fatal,
            Initializing | Pending | AlreadyReserved => Transient,
        }
    }

    /// True for the "gap-like" outcomes the validate loop treats as recoverable: the block
    /// stays cached and a dependency is registered instead of being deleted.
    pub fn is_gap_like(&self) -> bool {
        matches!(self.propagation_policy(), PropagationPolicy::Recoverable)
    }
}

/// Records the outcome of validating a block, including per-request results for RBs so a
/// retry can resume mid-block instead of re-checking requests that already succeeded.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub reason: Option<ResultCode>,
    pub per_request_results: BTreeMap<u32, ResultCode>,
    /// How many requests within an RB have already been applied on a prior pass.
    pub progress: u32,
}

impl ValidationStatus {
    pub fn ok() -> Self {
        Self {
            reason: Some(ResultCode::Progress),
            per_request_results: BTreeMap::new(),
            progress: 0,
        }
    }

    pub fn with_reason(reason: ResultCode) -> Self {
        Self {
            reason: Some(reason),
            per_request_results: BTreeMap::new(),
            progress: 0,
        }
    }
}
