//! Fundamental types for the keystore.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! keyring identifiers, key fingerprints, key records and schema versions.

pub mod error;
pub mod key;
pub mod keyring;
pub mod version;

pub use error::TypesError;
pub use key::{Fingerprint, KeyRecord, KeyType};
pub use keyring::{KeyringAttributes, KeyringId, LOCAL_KEYRING_ID};
pub use version::SchemaVersion;
