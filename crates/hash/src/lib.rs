#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! SHA-384 digests for stream file integrity
//!
//! Stream files, their metadata and the running hash that links
//! consecutive files are all SHA-384 digests. This crate provides the
//! fixed-size [`Hash`] value, an incremental [`HashBuilder`] and the
//! [`RunningHash`] fold used by the object-stream formats.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha384};
use std::fmt;
use strand_errors::{Error, ParseError};

/// Length in bytes of a SHA-384 digest
pub const HASH_LEN: usize = 48;

/// Digest algorithm used by a stream file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha384,
}

impl DigestAlgorithm {
    /// Wire identifier of the digest type inside serialized hash objects
    pub const SHA384_TYPE: i32 = 0x58ff_811b;

    /// Resolve an algorithm from its wire identifier
    #[must_use]
    pub fn from_type(digest_type: i32) -> Option<Self> {
        (digest_type == Self::SHA384_TYPE).then_some(Self::Sha384)
    }

    /// Wire identifier for this algorithm
    #[must_use]
    pub fn type_id(self) -> i32 {
        match self {
            Self::Sha384 => Self::SHA384_TYPE,
        }
    }

    /// Output size of the digest in bytes
    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha384 => HASH_LEN,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha384 => write!(f, "SHA-384"),
        }
    }
}

/// A SHA-384 hash value
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash {
    bytes: [u8; HASH_LEN],
}

impl Hash {
    /// The all-zero hash used as the previous hash of the first file in a stream
    pub const ZERO: Self = Self {
        bytes: [0u8; HASH_LEN],
    };

    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self { bytes }
    }

    /// Create a hash from a slice, checking its length
    ///
    /// # Errors
    /// Returns an error if the slice is not exactly 48 bytes long.
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; HASH_LEN] = slice.try_into().map_err(|_| ParseError::Malformed {
            filename: String::new(),
            reason: format!("hash must be {HASH_LEN} bytes, got {}", slice.len()),
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.bytes
    }

    /// True for the genesis all-zero hash
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from hex string
    ///
    /// # Errors
    /// Returns an error if the input is not valid hexadecimal or is not 96 characters (48 bytes).
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| ParseError::Malformed {
            filename: String::new(),
            reason: format!("invalid hex: {e}"),
        })?;
        Self::from_slice(&bytes)
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let mut builder = HashBuilder::new();
        builder.update(data);
        builder.finish()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..12])
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental SHA-384 computation
#[derive(Clone, Default)]
pub struct HashBuilder {
    hasher: Sha384,
}

impl HashBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self
    }

    pub fn update_i32(&mut self, value: i32) -> &mut Self {
        self.update(&value.to_be_bytes())
    }

    pub fn update_i64(&mut self, value: i64) -> &mut Self {
        self.update(&value.to_be_bytes())
    }

    #[must_use]
    pub fn finish(self) -> Hash {
        let digest = self.hasher.finalize();
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(&digest);
        Hash::from_bytes(bytes)
    }
}

/// Running hash over a sequence of serialized stream objects
///
/// Each step computes `next = SHA384(current ‖ SHA384(object))`, so the end
/// value of one file becomes the start value of the next.
#[derive(Debug, Clone)]
pub struct RunningHash {
    current: Hash,
}

impl RunningHash {
    #[must_use]
    pub fn new(start: Hash) -> Self {
        Self { current: start }
    }

    /// Fold one serialized object into the running hash
    pub fn add(&mut self, serialized_object: &[u8]) {
        let object_hash = Hash::from_data(serialized_object);
        let mut builder = HashBuilder::new();
        builder
            .update(self.current.as_bytes())
            .update(object_hash.as_bytes());
        self.current = builder.finish();
    }

    #[must_use]
    pub fn current(&self) -> &Hash {
        &self.current
    }

    #[must_use]
    pub fn into_hash(self) -> Hash {
        self.current
    }
}
