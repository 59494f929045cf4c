//! Storage abstractions for the keystore.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The schema registry and legacy-source access live here too, since
//! they describe *what* is stored independently of *how*.

pub mod error;
pub mod key_record;
pub mod keyring_attr;
pub mod legacy;
pub mod meta;
pub mod object;
pub mod schema;

pub use error::StoreError;
pub use key_record::{KeyRecordId, KeyRecordStore};
pub use keyring_attr::KeyringAttrStore;
pub use legacy::{LegacyAttributeSource, LegacyError, LegacyKeyring, LegacyLayout, LegacySnapshot};
pub use meta::MetaStore;
pub use object::Indexed;
pub use schema::{
    DataMigration, IndexDef, KeyPath, ObjectStoreDef, SchemaError, SchemaStep,
    SchemaVersionRegistry, CURRENT_SCHEMA_VERSION,
};
