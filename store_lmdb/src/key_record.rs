//! LMDB implementation of KeyRecordStore.

use std::sync::Arc;

use heed::Env;

use keystore_store::key_record::{KeyRecordId, KeyRecordStore};
use keystore_store::schema::{INDEX_FINGERPRINT, INDEX_KEYRING_ID, INDEX_TYPE};
use keystore_store::StoreError;
use keystore_types::{Fingerprint, KeyRecord, KeyType, KeyringId};

use crate::object_store::{id_from_key, id_key, ObjectStore};
use crate::LmdbError;

pub struct LmdbKeyRecordStore {
    pub(crate) env: Arc<Env>,
    pub(crate) store: ObjectStore,
}

fn with_ids(rows: Vec<(Vec<u8>, KeyRecord)>) -> Result<Vec<(KeyRecordId, KeyRecord)>, LmdbError> {
    rows.into_iter()
        .map(|(key, record)| Ok((id_from_key(&key)?, record)))
        .collect()
}

impl LmdbKeyRecordStore {
    fn by_index(
        &self,
        index: &str,
        value: &[u8],
    ) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let rows = self.store.index_get_all::<KeyRecord>(&rtxn, index, value)?;
        Ok(with_ids(rows)?)
    }
}

impl KeyRecordStore for LmdbKeyRecordStore {
    fn add_key(&self, record: &KeyRecord) -> Result<KeyRecordId, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = self.store.add(&mut wtxn, record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(id_from_key(&key)?)
    }

    fn get_key(&self, id: KeyRecordId) -> Result<Option<KeyRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.store.get(&rtxn, &id_key(id))?)
    }

    fn delete_key(&self, id: KeyRecordId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let deleted = self.store.delete::<KeyRecord>(&mut wtxn, &id_key(id))?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(deleted)
    }

    fn keys_by_keyring(
        &self,
        keyring_id: &KeyringId,
    ) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError> {
        self.by_index(INDEX_KEYRING_ID, keyring_id.as_str().as_bytes())
    }

    fn keys_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError> {
        self.by_index(INDEX_FINGERPRINT, fingerprint.as_str().as_bytes())
    }

    fn keys_by_type(&self, key_type: KeyType) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError> {
        self.by_index(INDEX_TYPE, key_type.as_str().as_bytes())
    }

    fn iter_keys(&self) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let rows = self.store.get_all::<KeyRecord>(&rtxn)?;
        Ok(with_ids(rows)?)
    }

    fn key_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.store.count(&rtxn)?)
    }
}
