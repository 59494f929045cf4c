//! Owned handle to a migrated key store.

use keystore_store::schema::{KEYRING_ATTR_STORE_DEF, KEYS_STORE_DEF};
use keystore_store::StoreError;
use keystore_types::SchemaVersion;

use crate::environment::{LmdbEnvironment, StoreOptions};
use crate::key_record::LmdbKeyRecordStore;
use crate::keyring_attr::LmdbKeyringAttrStore;
use crate::meta::LmdbMetaStore;
use crate::object_store::ObjectStore;
use crate::LmdbError;

/// The structured key store: keyring attributes and key records in one
/// LMDB environment.
///
/// Obtained from [`crate::MigrationEngine::run`] or, for a store that is
/// already migrated, [`KeyStore::open`]. Dropping it closes the environment.
pub struct KeyStore {
    env: LmdbEnvironment,
    keyring_attrs: LmdbKeyringAttrStore,
    keys: LmdbKeyRecordStore,
}

impl KeyStore {
    /// Open an existing store without migrating it.
    ///
    /// Fails with [`StoreError::MissingObjectStore`] if the schema was never
    /// installed.
    pub fn open(options: &StoreOptions) -> Result<Self, StoreError> {
        let env = LmdbEnvironment::open_with(options)?;
        Ok(Self::from_env(env)?)
    }

    /// Open the object store handles in a committed write transaction so
    /// they stay valid for the lifetime of the environment.
    pub(crate) fn from_env(env: LmdbEnvironment) -> Result<Self, LmdbError> {
        let wtxn = env.env().write_txn()?;
        let keyring_attrs =
            ObjectStore::open(env.env(), &wtxn, env.meta_db, KEYRING_ATTR_STORE_DEF)?;
        let keys = ObjectStore::open(env.env(), &wtxn, env.meta_db, KEYS_STORE_DEF)?;
        wtxn.commit()?;

        let shared = env.shared_env();
        Ok(Self {
            keyring_attrs: LmdbKeyringAttrStore {
                env: shared.clone(),
                store: keyring_attrs,
            },
            keys: LmdbKeyRecordStore {
                env: shared,
                store: keys,
            },
            env,
        })
    }

    pub fn keyring_attr_store(&self) -> &LmdbKeyringAttrStore {
        &self.keyring_attrs
    }

    pub fn key_record_store(&self) -> &LmdbKeyRecordStore {
        &self.keys
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        self.env.meta_store()
    }

    pub fn schema_version(&self) -> Result<SchemaVersion, LmdbError> {
        self.env.schema_version()
    }

    pub fn environment(&self) -> &LmdbEnvironment {
        &self.env
    }

    pub(crate) fn object_stores(&self) -> [&ObjectStore; 2] {
        [&self.keyring_attrs.store, &self.keys.store]
    }
}
