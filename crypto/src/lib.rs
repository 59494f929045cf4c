//! OpenPGP key extraction for the keystore.
//!
//! - [`OpenPgpBackend`] is the seam to an OpenPGP implementation
//! - [`RpgpBackend`] is the production backend, built on the `pgp` crate
//! - [`KeyRecordExtractor`] turns armored text into [`KeyRecord`]s
//! - [`blake2b_256`] digests oversized values for storage keys
//!
//! [`KeyRecord`]: keystore_types::KeyRecord

pub mod backend;
pub mod error;
pub mod extractor;
pub mod hash;
pub mod rpgp;

pub use backend::OpenPgpBackend;
pub use error::ParseError;
pub use extractor::{ExtractedKey, KeyRecordExtractor};
pub use hash::blake2b_256;
pub use rpgp::{ParsedKey, RpgpBackend};
