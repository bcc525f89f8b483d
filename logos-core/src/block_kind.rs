// SPDX-License-Identifier: Apache-2.0

//! A tagged union carrying any of the three block kinds by value, used at the boundaries where
//! the write queue and pending container need to move a block around without being generic over
//! its concrete type.

use logos_types::{EpochBlock, Hash, MicroBlock, RequestBlock};

#[derive(Clone, Debug)]
pub enum AnyBlock {
    Request(RequestBlock),
    Micro(MicroBlock),
    Epoch(EpochBlock),
}

impl AnyBlock {
    pub fn hash(&self) -> Hash {
        match self {
            AnyBlock::Request(b) => b.hash(),
            AnyBlock::Micro(b) => b.hash(),
            AnyBlock::Epoch(b) => b.hash(),
        }
    }

    pub fn epoch_number(&self) -> u32 {
        match self {
            AnyBlock::Request(b) => b.epoch_number,
            AnyBlock::Micro(b) => b.epoch_number,
            AnyBlock::Epoch(b) => b.epoch_number,
        }
    }

    pub fn sequence(&self) -> u32 {
        match self {
            AnyBlock::Request(b) => b.sequence,
            AnyBlock::Micro(b) => b.sequence,
            AnyBlock::Epoch(b) => b.sequence,
        }
    }

    pub fn previous(&self) -> Hash {
        match self {
            AnyBlock::Request(b) => b.previous,
            AnyBlock::Micro(b) => b.previous,
            AnyBlock::Epoch(b) => b.previous,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AnyBlock::Request(_) => "request_block",
            AnyBlock::Micro(_) => "micro_block",
            AnyBlock::Epoch(_) => "epoch_block",
        }
    }
}

impl From<RequestBlock> for AnyBlock {
    fn from(b: RequestBlock) -> Self {
        AnyBlock::Request(b)
    }
}

impl From<MicroBlock> for AnyBlock {
    fn from(b: MicroBlock) -> Self {
        AnyBlock::Micro(b)
    }
}

impl From<EpochBlock> for AnyBlock {
    fn from(b: EpochBlock) -> Self {
        AnyBlock::Epoch(b)
    }
}
