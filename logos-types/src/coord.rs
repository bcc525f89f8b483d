// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use logos_config::DelegateId;

/// Tags which of the three chains a `Coord` addresses, replacing the C++ `ChainPtr` union
/// (a tagged reference the original dereferenced through a base-class pointer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    RequestBlock,
    MicroBlock,
    EpochBlock,
}

/// A stable-index replacement for pointer-based `ChainPtr`: instead of a reference into the
/// pending container's arena, every waiter and every `hash_dependency_table` entry stores the
/// coordinates needed to look the slot back up. `slot_index` is only meaningful for
/// `ChainKind::RequestBlock`, where it names which of the 32 delegate streams the entry lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub epoch_index: usize,
    pub kind: ChainKind,
    pub slot_index: Option<DelegateId>,
    pub sequence: u32,
}

impl Coord {
    pub fn epoch(epoch_index: usize, sequence: u32) -> Self {
        Self {
            epoch_index,
            kind: ChainKind::EpochBlock,
            slot_index: None,
            sequence,
        }
    }

    pub fn micro(epoch_index: usize, sequence: u32) -> Self {
        Self {
            epoch_index,
            kind: ChainKind::MicroBlock,
            slot_index: None,
            sequence,
        }
    }

    pub fn request(epoch_index: usize, delegate: DelegateId, sequence: u32) -> Self {
        Self {
            epoch_index,
            kind: ChainKind::RequestBlock,
            slot_index: Some(delegate),
            sequence,
        }
    }
}
