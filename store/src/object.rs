//! Mapping records onto object-store keys and index values.

use keystore_types::{KeyRecord, KeyringAttributes};

use crate::schema::{INDEX_FINGERPRINT, INDEX_KEYRING_ID, INDEX_TYPE};

/// A record that can live in an object store.
///
/// Backends call [`Indexed::key_path_value`] for stores with an inline key
/// path and [`Indexed::index_value`] once per declared index. A `None` index
/// value means the record is absent from that index.
pub trait Indexed {
    fn key_path_value(&self, field: &str) -> Option<Vec<u8>>;

    fn index_value(&self, index: &str) -> Option<Vec<u8>>;
}

impl Indexed for KeyRecord {
    fn key_path_value(&self, _field: &str) -> Option<Vec<u8>> {
        None
    }

    fn index_value(&self, index: &str) -> Option<Vec<u8>> {
        match index {
            INDEX_KEYRING_ID => Some(self.keyring_id.as_str().as_bytes().to_vec()),
            INDEX_FINGERPRINT => Some(self.fingerprint.as_str().as_bytes().to_vec()),
            INDEX_TYPE => Some(self.key_type.as_str().as_bytes().to_vec()),
            _ => None,
        }
    }
}

impl Indexed for KeyringAttributes {
    fn key_path_value(&self, field: &str) -> Option<Vec<u8>> {
        match field {
            INDEX_KEYRING_ID => Some(self.keyring_id.as_str().as_bytes().to_vec()),
            _ => None,
        }
    }

    fn index_value(&self, _index: &str) -> Option<Vec<u8>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystore_types::{Fingerprint, KeyType, KeyringId};

    #[test]
    fn key_record_index_values() {
        let rec = KeyRecord {
            armored: "armored".into(),
            keyring_id: KeyringId::new("work").unwrap(),
            fingerprint: Fingerprint::from_hex("ABCD"),
            key_type: KeyType::Public,
        };
        assert_eq!(rec.index_value(INDEX_KEYRING_ID), Some(b"work".to_vec()));
        assert_eq!(rec.index_value(INDEX_FINGERPRINT), Some(b"abcd".to_vec()));
        assert_eq!(rec.index_value(INDEX_TYPE), Some(b"public".to_vec()));
        assert_eq!(rec.index_value("unknown"), None);
        assert_eq!(rec.key_path_value(INDEX_KEYRING_ID), None);
    }

    #[test]
    fn keyring_attributes_keyed_by_keyring_id() {
        let attrs = KeyringAttributes::new(KeyringId::new("work").unwrap(), None);
        assert_eq!(attrs.key_path_value(INDEX_KEYRING_ID), Some(b"work".to_vec()));
        assert_eq!(attrs.key_path_value("primaryKeyId"), None);
    }
}
