//! LMDB storage backend for the keystore.
//!
//! Implements the storage traits from `keystore-store` using the `heed` LMDB
//! bindings. Each object store maps to one LMDB database for its records plus
//! one database per secondary index, all within a single environment.
//!
//! The [`MigrationEngine`] is the entry point: it opens the environment,
//! brings the schema up to the requested version (importing legacy data on
//! the way) and hands back an owned [`KeyStore`].

pub mod environment;
pub mod error;
pub mod integrity;
pub mod key_record;
pub mod keyring_attr;
pub mod keystore;
pub mod legacy_import;
pub mod meta;
pub mod migration;
pub mod object_store;
pub mod write_batch;

pub use environment::{LmdbEnvironment, StoreOptions};
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use key_record::LmdbKeyRecordStore;
pub use keyring_attr::LmdbKeyringAttrStore;
pub use keystore::KeyStore;
pub use legacy_import::ImportSummary;
pub use meta::LmdbMetaStore;
pub use migration::{MigrationEngine, MigrationError, MigrationReport};
pub use object_store::ObjectStore;
pub use write_batch::WriteBatch;
