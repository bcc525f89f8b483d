// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::hash::Hash;

/// Identifies the head of a chain: the epoch it belongs to, its sequence number within that
/// chain, and the digest of the block itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tip {
    pub epoch_number: u32,
    pub sequence: u32,
    pub digest: Hash,
}

impl Tip {
    pub const NONE: Tip = Tip {
        epoch_number: 0,
        sequence: 0,
        digest: Hash::ZERO,
    };

    pub fn new(epoch_number: u32, sequence: u32, digest: Hash) -> Self {
        Self {
            epoch_number,
            sequence,
            digest,
        }
    }

    pub fn is_none(&self) -> bool {
        self.digest.is_zero()
    }
}
