//! Write batching: groups structural changes, record writes and the schema
//! version bump into a single LMDB write transaction.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.create_object_store(KEYS_STORE_DEF)?;
//! batch.add_key_record(&record)?;
//! batch.set_schema_version(SchemaVersion::new(1))?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], every
//! operation is rolled back, including object stores created in it.

use heed::RwTxn;

use keystore_store::schema::{ObjectStoreDef, KEYRING_ATTR_STORE, KEYS_STORE};
use keystore_store::Indexed;
use keystore_types::{KeyRecord, KeyringAttributes, SchemaVersion};
use serde::Serialize;

use crate::environment::LmdbEnvironment;
use crate::meta::write_schema_version;
use crate::object_store::{id_from_key, ObjectStore};
use crate::LmdbError;

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
    stores: Vec<ObjectStore>,
}

impl<'a> WriteBatch<'a> {
    /// Begin a new write batch.
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, LmdbError> {
        let txn = env.env().write_txn()?;
        Ok(Self {
            txn,
            env,
            stores: Vec::new(),
        })
    }

    /// Create an object store and its indexes. Creating a store that already
    /// exists reuses it.
    pub fn create_object_store(&mut self, def: ObjectStoreDef) -> Result<(), LmdbError> {
        let store = ObjectStore::create(self.env.env(), &mut self.txn, self.env.meta_db, def)?;
        self.stores.retain(|s| s.name() != def.name);
        self.stores.push(store);
        Ok(())
    }

    /// Handle to a store created in this batch or already in the database.
    pub fn object_store(&mut self, def: ObjectStoreDef) -> Result<ObjectStore, LmdbError> {
        if let Some(store) = self.stores.iter().find(|s| s.name() == def.name) {
            return Ok(store.clone());
        }
        let store = ObjectStore::open(self.env.env(), &self.txn, self.env.meta_db, def)?;
        self.stores.push(store.clone());
        Ok(store)
    }

    fn created(&self, name: &str) -> Result<&ObjectStore, LmdbError> {
        self.stores
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| LmdbError::MissingObjectStore(name.to_string()))
    }

    /// Add a record to a store known to this batch.
    pub fn add<T>(&mut self, store: &str, record: &T) -> Result<Vec<u8>, LmdbError>
    where
        T: Serialize + Indexed,
    {
        let store = self.created(store)?.clone();
        store.add(&mut self.txn, record)
    }

    pub fn add_keyring_attributes(&mut self, attrs: &KeyringAttributes) -> Result<(), LmdbError> {
        self.add(KEYRING_ATTR_STORE, attrs)?;
        Ok(())
    }

    /// Add a key record and return its generated id.
    pub fn add_key_record(&mut self, record: &KeyRecord) -> Result<u64, LmdbError> {
        let key = self.add(KEYS_STORE, record)?;
        id_from_key(&key)
    }

    pub fn set_schema_version(&mut self, version: SchemaVersion) -> Result<(), LmdbError> {
        write_schema_version(&self.env.meta_db, &mut self.txn, version)
    }

    /// Commit all batched operations in a single write transaction.
    pub fn commit(self) -> Result<(), LmdbError> {
        self.txn.commit()?;
        Ok(())
    }
}
