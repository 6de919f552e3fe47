#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Node signature handling
//!
//! Every consensus node publishes a signature file next to each data file.
//! [`SignatureFileReader`] decodes those files across their revisions and
//! [`NodePublicKey`] checks a signature against the node's published key.

mod key;
mod reader;

pub use key::{verify_signature, NodePublicKey};
pub use reader::SignatureFileReader;
