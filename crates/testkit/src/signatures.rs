//! Signature files over fixture hashes

use bytes::Bytes;
use ed25519_dalek::{Signer, SigningKey};
use strand_hash::Hash;
use strand_proto::legacy::{ByteWriter, OBJECT_STREAM_VERSION, TYPE_FILE_HASH, TYPE_SIGNATURE};
use strand_proto::{HashObject, Message, SignatureFile, SignatureObject};

use crate::keys::signing_key;
use crate::records::FixtureFile;

const ED25519: i32 = 1;

/// Signature file of `version` produced by `node_id` for `file`
#[must_use]
pub fn signature_file(version: u8, node_id: u64, file: &FixtureFile) -> Bytes {
    signature_file_with_key(
        version,
        &signing_key(node_id),
        &file.file_hash,
        file.metadata_hash.as_ref(),
    )
}

/// Signature file over arbitrary hashes with an arbitrary key
///
/// # Panics
///
/// Panics for unknown versions, or for version 5 without a metadata hash.
#[must_use]
pub fn signature_file_with_key(
    version: u8,
    key: &SigningKey,
    file_hash: &Hash,
    metadata_hash: Option<&Hash>,
) -> Bytes {
    let sign = |hash: &Hash| key.sign(hash.as_bytes()).to_bytes().to_vec();
    match version {
        4 => {
            let mut writer = ByteWriter::new();
            writer
                .put_u8(TYPE_FILE_HASH)
                .put_slice(file_hash.as_bytes())
                .put_u8(TYPE_SIGNATURE)
                .put_length_prefixed(&sign(file_hash));
            writer.into_bytes()
        }
        5 => {
            let metadata_hash = metadata_hash.expect("version 5 signs a metadata hash");
            let mut writer = ByteWriter::new();
            writer
                .put_u8(5)
                .put_i32(OBJECT_STREAM_VERSION)
                .put_hash_object(file_hash)
                .put_signature_object(ED25519, &sign(file_hash))
                .put_hash_object(metadata_hash)
                .put_signature_object(ED25519, &sign(metadata_hash));
            writer.into_bytes()
        }
        6 => {
            let object = |hash: &Hash| {
                let signature = sign(hash);
                let length = i32::try_from(signature.len()).unwrap_or_default();
                SignatureObject {
                    r#type: ED25519,
                    length,
                    checksum: 101 - length,
                    signature,
                    hash_object: Some(HashObject::from_hash(hash)),
                }
            };
            let message = SignatureFile {
                file_signature: Some(object(file_hash)),
                metadata_signature: metadata_hash.map(object),
            };
            let mut bytes = vec![6u8];
            bytes.extend(message.encode_to_vec());
            bytes.into()
        }
        other => panic!("no signature writer for version {other}"),
    }
}
