//! Fixed-layout binary encoding shared by the pre-protobuf revisions
//!
//! All integers are big-endian. Hash and signature objects are framed by a
//! class id and class version so the reader can tell them apart from the
//! stream items that sit between them.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use strand_errors::ParseError;
use strand_hash::{DigestAlgorithm, Hash, HASH_LEN};

/// Marker preceding the previous hash in a version 2 record file
pub const TYPE_PREV_HASH: u8 = 1;
/// Marker preceding each transaction/record pair in a version 2 record file
pub const TYPE_RECORD: u8 = 2;
/// Marker preceding the signature in a legacy signature file
pub const TYPE_SIGNATURE: u8 = 3;
/// Marker preceding the file hash in a legacy signature file
pub const TYPE_FILE_HASH: u8 = 4;

pub const HASH_OBJECT_CLASS_ID: i64 = 0xf422_da83_a251_741e_u64 as i64;
pub const RECORD_STREAM_OBJECT_CLASS_ID: i64 = 0xe370_929b_a542_9d8b_u64 as i64;
pub const SIGNATURE_OBJECT_CLASS_ID: i64 = 0x13dc_4b39_9b24_5c69;
pub const CLASS_VERSION: i32 = 1;
pub const OBJECT_STREAM_VERSION: i32 = 1;

/// Upper bound for any length-prefixed field
pub const MAX_FIELD_LEN: usize = 64 * 1024 * 1024;

/// Checked big-endian cursor over a byte slice
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    filename: &'a str,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8], filename: &'a str) -> Self {
        Self {
            buf,
            pos: 0,
            filename,
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes between two absolute positions already consumed
    #[must_use]
    pub fn consumed(&self, from: usize) -> &'a [u8] {
        &self.buf[from.min(self.pos)..self.pos]
    }

    /// Look at the next eight bytes as a class id without consuming them
    #[must_use]
    pub fn peek_i64(&self) -> Option<i64> {
        let mut slice = self.buf.get(self.pos..self.pos + 8)?;
        Some(slice.get_i64())
    }

    /// # Errors
    /// Returns `Truncated` if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < n {
            return Err(ParseError::Truncated {
                filename: self.filename.to_string(),
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// # Errors
    /// Returns `Truncated` at end of input.
    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?.get_u8())
    }

    /// # Errors
    /// Returns `Truncated` at end of input.
    pub fn read_i32(&mut self) -> Result<i32, ParseError> {
        Ok(self.take(4)?.get_i32())
    }

    /// # Errors
    /// Returns `Truncated` at end of input.
    pub fn read_i64(&mut self) -> Result<i64, ParseError> {
        Ok(self.take(8)?.get_i64())
    }

    /// Read an `i32` length followed by that many bytes
    ///
    /// # Errors
    /// Returns `Malformed` for negative or oversized lengths and `Truncated`
    /// when the payload is cut short.
    pub fn read_length_prefixed(&mut self) -> Result<&'a [u8], ParseError> {
        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_FIELD_LEN)
            .ok_or_else(|| self.malformed(format!("invalid field length {len}")))?;
        self.take(len)
    }

    /// # Errors
    /// Returns `Malformed` if the next byte is not `marker`.
    pub fn expect_u8(&mut self, marker: u8, what: &str) -> Result<(), ParseError> {
        let actual = self.read_u8()?;
        if actual == marker {
            Ok(())
        } else {
            Err(self.malformed(format!("expected {what} marker {marker}, found {actual}")))
        }
    }

    /// # Errors
    /// Returns `Truncated` if fewer than 48 bytes remain.
    pub fn read_hash(&mut self) -> Result<Hash, ParseError> {
        let bytes = self.take(HASH_LEN)?;
        let mut array = [0u8; HASH_LEN];
        array.copy_from_slice(bytes);
        Ok(Hash::from_bytes(array))
    }

    /// Read a framed hash object
    ///
    /// # Errors
    /// Returns `Malformed` for a wrong class id, unsupported digest or length.
    pub fn read_hash_object(&mut self) -> Result<Hash, ParseError> {
        self.expect_class(HASH_OBJECT_CLASS_ID, "hash object")?;
        let digest_type = self.read_i32()?;
        if DigestAlgorithm::from_type(digest_type).is_none() {
            return Err(self.malformed(format!("unsupported digest type {digest_type:#x}")));
        }
        let len = self.read_i32()?;
        if usize::try_from(len).ok() != Some(HASH_LEN) {
            return Err(self.malformed(format!("hash object length {len}")));
        }
        self.read_hash()
    }

    /// Read a framed signature object, returning its type and bytes
    ///
    /// # Errors
    /// Returns `Malformed` for a wrong class id or checksum.
    pub fn read_signature_object(&mut self) -> Result<(i32, &'a [u8]), ParseError> {
        self.expect_class(SIGNATURE_OBJECT_CLASS_ID, "signature object")?;
        let sig_type = self.read_i32()?;
        let len = self.read_i32()?;
        let checksum = self.read_i32()?;
        if signature_checksum(len) != Some(checksum) {
            return Err(self.malformed(format!("signature checksum {checksum} for length {len}")));
        }
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= MAX_FIELD_LEN)
            .ok_or_else(|| self.malformed(format!("invalid signature length {len}")))?;
        Ok((sig_type, self.take(len)?))
    }

    /// # Errors
    /// Returns `Malformed` if the next class id or version does not match.
    pub fn expect_class(&mut self, class_id: i64, what: &str) -> Result<(), ParseError> {
        let actual = self.read_i64()?;
        if actual != class_id {
            return Err(self.malformed(format!("expected {what} class id {class_id:#x}, found {actual:#x}")));
        }
        let version = self.read_i32()?;
        if version != CLASS_VERSION {
            return Err(self.malformed(format!("unsupported {what} class version {version}")));
        }
        Ok(())
    }

    #[must_use]
    pub fn malformed(&self, reason: impl Into<String>) -> ParseError {
        ParseError::malformed(self.filename, reason)
    }
}

/// Checksum stored next to a signature length
///
/// `None` when the length is so negative that no `i32` checksum exists; such
/// a length can only come from a corrupt or hostile file.
#[must_use]
pub fn signature_checksum(len: i32) -> Option<i32> {
    101i32.checked_sub(len)
}

/// Big-endian writer producing the same framing [`ByteReader`] consumes
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: BytesMut,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32(value);
        self
    }

    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64(value);
        self
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Lengths past `i32::MAX` saturate; readers reject them anyway
    pub fn put_length_prefixed(&mut self, bytes: &[u8]) -> &mut Self {
        let len = i32::try_from(bytes.len()).unwrap_or(i32::MAX);
        self.put_i32(len).put_slice(bytes)
    }

    pub fn put_hash_object(&mut self, hash: &Hash) -> &mut Self {
        self.put_i64(HASH_OBJECT_CLASS_ID)
            .put_i32(CLASS_VERSION)
            .put_i32(DigestAlgorithm::SHA384_TYPE)
            .put_length_prefixed(hash.as_bytes())
    }

    pub fn put_signature_object(&mut self, sig_type: i32, signature: &[u8]) -> &mut Self {
        let len = i32::try_from(signature.len()).unwrap_or(i32::MAX);
        self.put_i64(SIGNATURE_OBJECT_CLASS_ID)
            .put_i32(CLASS_VERSION)
            .put_i32(sig_type)
            .put_i32(len)
            // lengths written here are never negative, so the checksum exists
            .put_i32(signature_checksum(len).unwrap_or_default())
            .put_slice(signature)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_object_framing() {
        let hash = Hash::from_data(b"start");
        let mut writer = ByteWriter::new();
        writer.put_hash_object(&hash);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 8 + 4 + 4 + 4 + HASH_LEN);

        let mut reader = ByteReader::new(&bytes, "f");
        assert_eq!(reader.peek_i64(), Some(HASH_OBJECT_CLASS_ID));
        assert_eq!(reader.read_hash_object().unwrap(), hash);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_input() {
        let mut reader = ByteReader::new(&[0, 0, 1], "short.rcd");
        let err = reader.read_i32().unwrap_err();
        assert!(matches!(
            err,
            ParseError::Truncated {
                needed: 4,
                remaining: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_negative_length_rejected() {
        let mut writer = ByteWriter::new();
        writer.put_i32(-5);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes, "neg.rcd");
        assert!(matches!(
            reader.read_length_prefixed(),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn test_signature_checksum_enforced() {
        let mut writer = ByteWriter::new();
        writer.put_signature_object(1, &[7u8; 64]);
        let mut bytes = writer.into_bytes().to_vec();
        let (sig_type, sig) = ByteReader::new(&bytes, "s").read_signature_object().unwrap();
        assert_eq!(sig_type, 1);
        assert_eq!(sig, &[7u8; 64][..]);

        // corrupt the checksum field
        bytes[8 + 4 + 4 + 4 + 3] ^= 0xff;
        assert!(ByteReader::new(&bytes, "s").read_signature_object().is_err());
    }

    #[test]
    fn test_hostile_signature_length_is_malformed() {
        for len in [i32::MIN, i32::MIN + 50, -1] {
            let mut writer = ByteWriter::new();
            writer
                .put_i64(SIGNATURE_OBJECT_CLASS_ID)
                .put_i32(CLASS_VERSION)
                .put_i32(1)
                .put_i32(len)
                .put_i32(0)
                .put_slice(&[0u8; 64]);
            let bytes = writer.into_bytes();
            assert!(matches!(
                ByteReader::new(&bytes, "hostile_sig").read_signature_object(),
                Err(ParseError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn test_checksum_bounds() {
        assert_eq!(signature_checksum(64), Some(37));
        assert_eq!(signature_checksum(i32::MIN), None);
    }
}
