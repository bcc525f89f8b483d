// SPDX-License-Identifier: Apache-2.0

//! The core never implements BLS aggregate signatures, ECIES, or ed25519 itself — it treats
//! "verify an aggregate signature" and "sign a message" as capabilities injected at construction
//! (see `AggregateSignatureVerifier` / `BlockSigner`). The concrete key material here is kept as
//! opaque byte blobs so the wire format and `Delegate` layout are complete without pulling in a
//! cryptographic scheme implementation this crate has no business owning.

use fastcrypto::hash::Blake2b256;
use serde::{Deserialize, Serialize};

use crate::delegate::DelegateId;

/// Defines the hash function used for block/request digests. Computing a digest is in scope
/// (the core hashes blocks to key its caches); verifying signatures over that digest is not.
pub type DefaultHashFunction = Blake2b256;
pub const DIGEST_LENGTH: usize = 32;

/// A delegate's consensus (BLS) public key, opaque to this crate beyond its byte encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusPublicKey(#[serde(with = "serde_bytes_array")] pub [u8; 96]);

/// A delegate's ECIES public key, used (outside this crate) to encrypt epoch-transition secrets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EciesPublicKey(#[serde(with = "serde_bytes_array")] pub [u8; 65]);

/// An aggregate BLS signature over a block, opaque to this crate beyond its byte encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSignature(pub Vec<u8>);

/// Injected capability: verify that `signature` is a valid aggregate signature by `signers`
/// (a subset of the epoch committee) over `message`. The core calls this once per block and
/// never inspects the BLS machinery behind it.
pub trait AggregateSignatureVerifier: Send + Sync {
    fn verify_aggregate(
        &self,
        message: &[u8],
        signature: &AggregateSignature,
        signers: &[DelegateId],
    ) -> bool;
}

/// Injected capability: sign a message with this node's own delegate key, used only on the
/// local-consensus path that the core does not implement (store_* is always direct_write).
pub trait BlockSigner: Send + Sync {
    fn sign(&self, message: &[u8]) -> AggregateSignature;
}

/// A verifier that accepts everything. Used by tests that want to exercise the cache/write-queue
/// pipeline without constructing real key material (spec's "pass-through capability").
#[derive(Default)]
pub struct NoopSignatureVerifier;

impl AggregateSignatureVerifier for NoopSignatureVerifier {
    fn verify_aggregate(
        &self,
        _message: &[u8],
        _signature: &AggregateSignature,
        _signers: &[DelegateId],
    ) -> bool {
        true
    }
}

mod serde_bytes_array {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        bytes.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let slice: Vec<u8> = Vec::deserialize(deserializer)?;
        slice
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("expected {N} bytes, got {}", v.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_verifier_always_accepts() {
        let verifier = NoopSignatureVerifier;
        let sig = AggregateSignature(vec![0u8; 4]);
        assert!(verifier.verify_aggregate(b"anything", &sig, &[]));
    }
}
