//! Public keys from the address book

use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use strand_errors::SigningError;
use strand_hash::Hash;
use strand_types::{ConsensusNode, SignatureAlgorithm};

/// A node's verification key decoded from its hex form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePublicKey {
    node: String,
    key: VerifyingKey,
}

impl NodePublicKey {
    /// Decode a hex-encoded Ed25519 public key
    ///
    /// # Errors
    ///
    /// Returns `InvalidPublicKey` if the string is not hex, has the wrong
    /// length, or is not a valid curve point.
    pub fn from_hex(node: impl Into<String>, public_key: &str) -> Result<Self, SigningError> {
        let node = node.into();
        let invalid = |reason: String| SigningError::InvalidPublicKey {
            node: node.clone(),
            reason,
        };

        let bytes = hex::decode(public_key.trim()).map_err(|e| invalid(e.to_string()))?;
        let array: [u8; PUBLIC_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
            invalid(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&array).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { node, key })
    }

    /// Key of a consensus node
    ///
    /// # Errors
    ///
    /// Returns `NoTrustedKeyFound` for an empty key and `InvalidPublicKey`
    /// for one that cannot be decoded.
    pub fn for_node(node: &ConsensusNode) -> Result<Self, SigningError> {
        if node.public_key.trim().is_empty() {
            return Err(SigningError::NoTrustedKeyFound {
                node: node.account_id(),
            });
        }
        Self::from_hex(node.account_id(), &node.public_key)
    }

    /// Verify a signature over the raw hash bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignatureFormat` for a signature of the wrong length
    /// and `VerificationFailed` when it does not match.
    pub fn verify(&self, hash: &Hash, signature: &[u8]) -> Result<(), SigningError> {
        let array: [u8; SIGNATURE_LENGTH] = signature.try_into().map_err(|_| {
            SigningError::InvalidSignatureFormat(format!(
                "expected {SIGNATURE_LENGTH} signature bytes from node {}, got {}",
                self.node,
                signature.len()
            ))
        })?;
        let signature = Signature::from_bytes(&array);
        self.key
            .verify(hash.as_bytes(), &signature)
            .map_err(|e| SigningError::VerificationFailed {
                node: self.node.clone(),
                reason: e.to_string(),
            })
    }
}

/// Verify that `node` signed `hash` with `algorithm`
///
/// # Errors
///
/// Returns a [`SigningError`] if the node's key is unusable or the signature
/// does not verify.
pub fn verify_signature(
    node: &ConsensusNode,
    algorithm: SignatureAlgorithm,
    hash: &Hash,
    signature: &[u8],
) -> Result<(), SigningError> {
    match algorithm {
        SignatureAlgorithm::Ed25519 => NodePublicKey::for_node(node)?.verify(hash, signature),
    }
}
