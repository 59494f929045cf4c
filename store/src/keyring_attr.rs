//! Keyring attribute storage trait.

use keystore_types::{KeyringAttributes, KeyringId};

use crate::StoreError;

/// One row of [`KeyringAttributes`] per keyring, keyed by keyring id.
pub trait KeyringAttrStore {
    /// Attributes of a keyring, if the keyring is known.
    fn get_keyring_attributes(
        &self,
        keyring_id: &KeyringId,
    ) -> Result<Option<KeyringAttributes>, StoreError>;

    /// Insert or replace the attributes of a keyring.
    fn put_keyring_attributes(&self, attrs: &KeyringAttributes) -> Result<(), StoreError>;

    /// Remove a keyring's attributes. Returns `false` if none were stored.
    fn delete_keyring_attributes(&self, keyring_id: &KeyringId) -> Result<bool, StoreError>;

    /// All keyring attributes, ordered by keyring id.
    fn iter_keyring_attributes(&self) -> Result<Vec<KeyringAttributes>, StoreError>;

    /// Number of keyrings.
    fn keyring_count(&self) -> Result<u64, StoreError>;
}
