// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use fastcrypto::hash::HashFunction;
use logos_config::DefaultHashFunction;
use serde::{Deserialize, Serialize};

/// 256-bit opaque identifier, used as a map key everywhere a block or request needs naming.
/// The all-zero value denotes "none" (e.g. the `previous` of a chain's first block).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Hashes the BCS encoding of `value`. Blocks are hashed this way to key the cache and
    /// storage tables; the core never inspects signature material while doing so.
    pub fn of<T: Serialize>(value: &T) -> Self {
        let mut hasher = DefaultHashFunction::new();
        hasher.update(bcs::to_bytes(value).expect("serialization of hashed value must not fail"));
        Hash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(value: [u8; 32]) -> Self {
        Hash(value)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_is_zero() {
        assert!(Hash::ZERO.is_zero());
        assert!(!Hash::of(&42u32).is_zero());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let h = Hash([0xabu8; 32]);
        assert_eq!(h.to_string(), "ab".repeat(32));
    }

    #[test]
    fn of_is_deterministic() {
        assert_eq!(Hash::of(&"same"), Hash::of(&"same"));
        assert_ne!(Hash::of(&"a"), Hash::of(&"b"));
    }
}
