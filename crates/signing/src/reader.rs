//! Signature file decoding
//!
//! The first byte selects the layout: `4` is the legacy file-hash-only
//! layout, `5` adds a metadata hash using framed objects, `6` is a protobuf
//! `SignatureFile`.

use strand_errors::{Error, ParseError, SigningError};
use strand_hash::Hash;
use strand_proto::legacy::{ByteReader, OBJECT_STREAM_VERSION, TYPE_FILE_HASH, TYPE_SIGNATURE};
use strand_proto::{Message, SignatureFile, SignatureObject};
use strand_types::{FileKind, SignatureAlgorithm, StreamFileData, StreamFileSignature};
use tracing::trace;

const VERSION_LEGACY: u8 = TYPE_FILE_HASH;
const VERSION_OBJECT_STREAM: u8 = 5;
const VERSION_PROTOBUF: u8 = 6;

/// Decoder for node signature files
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureFileReader;

impl SignatureFileReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decode one node's signature file
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for malformed content or an unknown version
    /// byte, and `UnsupportedAlgorithm` for signature types other than
    /// Ed25519.
    pub fn read(&self, data: &StreamFileData) -> Result<StreamFileSignature, Error> {
        let filename = data.filename.as_str();
        if data.filename.kind() != FileKind::Signature {
            return Err(ParseError::malformed(filename, "not a signature file name").into());
        }
        let version = *data
            .bytes
            .first()
            .ok_or_else(|| ParseError::malformed(filename, "empty signature file"))?;
        trace!(filename, node = %data.node, version, "reading signature file");

        let decoded = match version {
            VERSION_LEGACY => read_legacy(&data.bytes, filename)?,
            VERSION_OBJECT_STREAM => read_object_stream(&data.bytes, filename)?,
            VERSION_PROTOBUF => read_protobuf(&data.bytes[1..], filename)?,
            other => {
                return Err(ParseError::UnknownVersion {
                    filename: filename.to_string(),
                    version: i32::from(other),
                }
                .into())
            }
        };

        Ok(StreamFileSignature {
            node: data.node,
            filename: data.filename.clone(),
            file_hash: decoded.file_hash,
            file_signature: decoded.file_signature,
            metadata_hash: decoded.metadata_hash,
            metadata_signature: decoded.metadata_signature,
            algorithm: decoded.algorithm,
            version,
        })
    }
}

struct Decoded {
    file_hash: Hash,
    file_signature: Vec<u8>,
    metadata_hash: Option<Hash>,
    metadata_signature: Option<Vec<u8>>,
    algorithm: SignatureAlgorithm,
}

fn signature_algorithm(sig_type: i32) -> Result<SignatureAlgorithm, SigningError> {
    SignatureAlgorithm::from_type(sig_type).ok_or(SigningError::UnsupportedAlgorithm {
        algorithm: sig_type,
    })
}

fn read_legacy(bytes: &[u8], filename: &str) -> Result<Decoded, Error> {
    let mut reader = ByteReader::new(bytes, filename);
    reader.expect_u8(TYPE_FILE_HASH, "file hash")?;
    let file_hash = reader.read_hash()?;
    reader.expect_u8(TYPE_SIGNATURE, "signature")?;
    let signature = reader.read_length_prefixed()?.to_vec();
    if !reader.is_empty() {
        return Err(reader.malformed("trailing bytes after signature").into());
    }
    Ok(Decoded {
        file_hash,
        file_signature: signature,
        metadata_hash: None,
        metadata_signature: None,
        algorithm: SignatureAlgorithm::Ed25519,
    })
}

fn read_object_stream(bytes: &[u8], filename: &str) -> Result<Decoded, Error> {
    let mut reader = ByteReader::new(bytes, filename);
    reader.expect_u8(VERSION_OBJECT_STREAM, "version")?;
    let stream_version = reader.read_i32()?;
    if stream_version != OBJECT_STREAM_VERSION {
        return Err(reader
            .malformed(format!("unsupported object stream version {stream_version}"))
            .into());
    }

    let file_hash = reader.read_hash_object()?;
    let (file_type, file_signature) = reader.read_signature_object()?;
    let metadata_hash = reader.read_hash_object()?;
    let (metadata_type, metadata_signature) = reader.read_signature_object()?;
    if !reader.is_empty() {
        return Err(reader.malformed("trailing bytes after metadata signature").into());
    }

    let algorithm = signature_algorithm(file_type)?;
    if algorithm != signature_algorithm(metadata_type)? {
        return Err(
            ParseError::malformed(filename, "file and metadata signature types differ").into(),
        );
    }
    Ok(Decoded {
        file_hash,
        file_signature: file_signature.to_vec(),
        metadata_hash: Some(metadata_hash),
        metadata_signature: Some(metadata_signature.to_vec()),
        algorithm,
    })
}

fn read_protobuf(bytes: &[u8], filename: &str) -> Result<Decoded, Error> {
    let file = SignatureFile::decode(bytes)
        .map_err(|e| ParseError::malformed(filename, format!("invalid signature file: {e}")))?;

    let file_signature = file
        .file_signature
        .ok_or_else(|| ParseError::malformed(filename, "missing file signature"))?;
    let (file_hash, algorithm) = signature_parts(&file_signature, filename)?;

    let (metadata_hash, metadata_signature) = match file.metadata_signature {
        Some(meta) => {
            let (hash, meta_algorithm) = signature_parts(&meta, filename)?;
            if meta_algorithm != algorithm {
                return Err(
                    ParseError::malformed(filename, "file and metadata signature types differ")
                        .into(),
                );
            }
            (Some(hash), Some(meta.signature))
        }
        None => (None, None),
    };

    Ok(Decoded {
        file_hash,
        file_signature: file_signature.signature,
        metadata_hash,
        metadata_signature,
        algorithm,
    })
}

fn signature_parts(
    object: &SignatureObject,
    filename: &str,
) -> Result<(Hash, SignatureAlgorithm), Error> {
    let hash = object
        .hash_object
        .as_ref()
        .ok_or_else(|| ParseError::malformed(filename, "signature without hash object"))?
        .to_hash(filename)?;
    Ok((hash, signature_algorithm(object.r#type)?))
}
