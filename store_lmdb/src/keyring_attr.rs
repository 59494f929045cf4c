//! LMDB implementation of KeyringAttrStore.

use std::sync::Arc;

use heed::Env;

use keystore_store::keyring_attr::KeyringAttrStore;
use keystore_store::StoreError;
use keystore_types::{KeyringAttributes, KeyringId};

use crate::object_store::{inline_key_for, ObjectStore};
use crate::LmdbError;

pub struct LmdbKeyringAttrStore {
    pub(crate) env: Arc<Env>,
    pub(crate) store: ObjectStore,
}

impl KeyringAttrStore for LmdbKeyringAttrStore {
    fn get_keyring_attributes(
        &self,
        keyring_id: &KeyringId,
    ) -> Result<Option<KeyringAttributes>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = inline_key_for(keyring_id.as_str().as_bytes());
        let attrs: Option<KeyringAttributes> = self.store.get(&rtxn, &key)?;
        Ok(attrs.filter(|a| &a.keyring_id == keyring_id))
    }

    fn put_keyring_attributes(&self, attrs: &KeyringAttributes) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.store.put(&mut wtxn, attrs)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_keyring_attributes(&self, keyring_id: &KeyringId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = inline_key_for(keyring_id.as_str().as_bytes());
        let stored: Option<KeyringAttributes> = self.store.get(&wtxn, &key)?;
        if stored.map_or(true, |a| &a.keyring_id != keyring_id) {
            return Ok(false);
        }
        let deleted = self
            .store
            .delete::<KeyringAttributes>(&mut wtxn, &key)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(deleted)
    }

    fn iter_keyring_attributes(&self) -> Result<Vec<KeyringAttributes>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let all = self.store.get_all::<KeyringAttributes>(&rtxn)?;
        Ok(all.into_iter().map(|(_, attrs)| attrs).collect())
    }

    fn keyring_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.store.count(&rtxn)?)
    }
}
