// SPDX-License-Identifier: Apache-2.0

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::request::Request;
use crate::tip::Tip;
use logos_config::{Delegate, NUM_DELEGATES};

/// Common accessors every block kind exposes to the core. Replaces run-time polymorphism
/// (a base-class pointer) with a tagged variant matched via `enum_dispatch`.
#[enum_dispatch]
pub trait BlockAPI {
    fn epoch_number(&self) -> u32;
    fn sequence(&self) -> u32;
    fn previous(&self) -> Hash;
    fn hash(&self) -> Hash;
}

/// A tagged union over the three block kinds, replacing the pointer-based `ChainPtr` the
/// original used to move blocks through the pipeline without knowing their concrete type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[enum_dispatch(BlockAPI)]
pub enum Block {
    Request(RequestBlock),
    Micro(MicroBlock),
    Epoch(EpochBlock),
}

/// Per-delegate consensus block containing an ordered list of user requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBlock {
    pub epoch_number: u32,
    pub primary_delegate: u8,
    pub sequence: u32,
    pub previous: Hash,
    pub requests: Vec<Request>,
}

impl RequestBlock {
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }
}

impl BlockAPI for RequestBlock {
    fn epoch_number(&self) -> u32 {
        self.epoch_number
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn previous(&self) -> Hash {
        self.previous
    }

    fn hash(&self) -> Hash {
        RequestBlock::hash(self)
    }
}

/// Checkpoint block summarizing the tips of all delegate RB chains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroBlock {
    pub epoch_number: u32,
    pub primary_delegate: u8,
    pub sequence: u32,
    pub previous: Hash,
    pub last_micro_block: bool,
    pub tips: [Tip; NUM_DELEGATES],
    pub number_batch_blocks: u64,
}

impl MicroBlock {
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }
}

impl BlockAPI for MicroBlock {
    fn epoch_number(&self) -> u32 {
        self.epoch_number
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn previous(&self) -> Hash {
        self.previous
    }

    fn hash(&self) -> Hash {
        MicroBlock::hash(self)
    }
}

/// Checkpoint block rotating the delegate set and summarizing the MB chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochBlock {
    pub epoch_number: u32,
    pub primary_delegate: u8,
    pub sequence: u32,
    pub previous: Hash,
    pub micro_block_tip: Tip,
    pub total_rbs: u64,
    pub total_supply: u128,
    pub transaction_fee_pool: u128,
    pub delegates: Vec<Delegate>,
    pub is_extension: bool,
}

impl EpochBlock {
    pub fn hash(&self) -> Hash {
        Hash::of(self)
    }
}

impl BlockAPI for EpochBlock {
    fn epoch_number(&self) -> u32 {
        self.epoch_number
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn previous(&self) -> Hash {
        self.previous
    }

    fn hash(&self) -> Hash {
        EpochBlock::hash(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_tips() -> [Tip; NUM_DELEGATES] {
        std::array::from_fn(|_| Tip::NONE)
    }

    #[test]
    fn micro_block_hash_is_stable_under_clone() {
        let mb = MicroBlock {
            epoch_number: 1,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            last_micro_block: false,
            tips: empty_tips(),
            number_batch_blocks: 0,
        };
        assert_eq!(mb.hash(), mb.clone().hash());
    }

    #[test]
    fn block_api_dispatches_through_enum() {
        let rb = RequestBlock {
            epoch_number: 2,
            primary_delegate: 5,
            sequence: 9,
            previous: Hash::ZERO,
            requests: vec![],
        };
        let expected = rb.hash();
        let block: Block = rb.into();
        assert_eq!(block.epoch_number(), 2);
        assert_eq!(block.sequence(), 9);
        assert_eq!(block.hash(), expected);
    }
}
