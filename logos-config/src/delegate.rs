// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::crypto::{ConsensusPublicKey, EciesPublicKey};

/// Exactly this many delegates are active per epoch. A fixed fleet size, not a runtime setting:
/// the request-block stream array, the frontier exchange's 32 per-delegate responses, and the
/// container's `[EpochPeriod::rbs; NUM_DELEGATES]` array all depend on it.
pub const NUM_DELEGATES: usize = 32;

pub type Epoch = u32;
pub type Stake = u128;
pub type AccountAddress = [u8; 32];

/// Identifies one of the 32 delegate chains of an epoch. Constructing one validates the range,
/// replacing the bare `u8 ∈ [0,32)` convention of the original with a type the compiler enforces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DelegateId(u8);

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("delegate id {0} out of range [0, {NUM_DELEGATES})")]
pub struct DelegateIdOutOfRange(u8);

impl DelegateId {
    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = DelegateId> {
        (0..NUM_DELEGATES as u8).map(DelegateId)
    }
}

impl TryFrom<u8> for DelegateId {
    type Error = DelegateIdOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (value as usize) < NUM_DELEGATES {
            Ok(Self(value))
        } else {
            Err(DelegateIdOutOfRange(value))
        }
    }
}

impl From<DelegateId> for usize {
    fn from(id: DelegateId) -> Self {
        id.0 as usize
    }
}

impl std::fmt::Display for DelegateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the 32 delegates elected for an epoch by the (out of scope) election/staking logic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub account: AccountAddress,
    pub consensus_pubkey: ConsensusPublicKey,
    pub ecies_pubkey: EciesPublicKey,
    pub vote_weight: Stake,
    pub stake: Stake,
    pub starting_term: Epoch,
}

/// The delegate set for one epoch, as published by the epoch block that began it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpochCommittee {
    epoch: Epoch,
    delegates: Vec<Delegate>,
}

impl EpochCommittee {
    pub fn new(epoch: Epoch, delegates: Vec<Delegate>) -> Self {
        assert_eq!(delegates.len(), NUM_DELEGATES, "committee must have exactly NUM_DELEGATES delegates");
        Self { epoch, delegates }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn delegate(&self, id: DelegateId) -> &Delegate {
        &self.delegates[usize::from(id)]
    }

    pub fn delegates(&self) -> impl Iterator<Item = (DelegateId, &Delegate)> {
        DelegateId::all().zip(self.delegates.iter())
    }

    pub fn total_stake(&self) -> Stake {
        self.delegates.iter().map(|d| d.stake).sum()
    }

    /// 2f+1 of total stake.
    pub fn quorum_threshold(&self) -> Stake {
        let total = self.total_stake();
        2 * total / 3 + 1
    }
}
