//! Metadata storage trait.

use keystore_types::SchemaVersion;

use crate::StoreError;

/// Trait for storing database metadata (schema version and other bookkeeping).
pub trait MetaStore {
    /// Store a metadata value.
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a metadata value.
    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete a metadata entry.
    fn delete_meta(&self, key: &str) -> Result<(), StoreError>;

    /// Installed schema version; [`SchemaVersion::UNINITIALIZED`] if none is stored.
    fn get_schema_version(&self) -> Result<SchemaVersion, StoreError>;

    /// Record the installed schema version.
    fn set_schema_version(&self, version: SchemaVersion) -> Result<(), StoreError>;
}
