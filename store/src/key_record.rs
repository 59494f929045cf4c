//! Key record storage trait.

use keystore_types::{Fingerprint, KeyRecord, KeyType, KeyringId};

use crate::StoreError;

/// Store-generated identifier of a key record. Starts at 1.
pub type KeyRecordId = u64;

/// Auto-keyed storage of [`KeyRecord`]s with lookups by keyring,
/// fingerprint and type.
pub trait KeyRecordStore {
    /// Add a record and return its generated id.
    fn add_key(&self, record: &KeyRecord) -> Result<KeyRecordId, StoreError>;

    /// Retrieve a record by id.
    fn get_key(&self, id: KeyRecordId) -> Result<Option<KeyRecord>, StoreError>;

    /// Delete a record and its index entries. Returns `false` if absent.
    fn delete_key(&self, id: KeyRecordId) -> Result<bool, StoreError>;

    /// All records owned by a keyring.
    fn keys_by_keyring(
        &self,
        keyring_id: &KeyringId,
    ) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError>;

    /// All records with the given fingerprint, across keyrings.
    fn keys_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError>;

    /// All records of the given type.
    fn keys_by_type(&self, key_type: KeyType) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError>;

    /// Every record in id order.
    fn iter_keys(&self) -> Result<Vec<(KeyRecordId, KeyRecord)>, StoreError>;

    /// Number of records.
    fn key_count(&self) -> Result<u64, StoreError>;
}
