//! Builder for legacy storage snapshots.

use keystore_store::legacy::{
    key_list_name, LEGACY_KEYRING_ATTR, LEGACY_PREFERENCES,
};
use keystore_store::{LegacyAttributeSource, LegacySnapshot};
use keystore_types::{KeyType, KeyringId};
use serde_json::{json, Map, Value};

/// Builds a [`LegacySnapshot`] the way the legacy code would have laid it
/// out.
///
/// Key lists are named relative to the local keyring, so keys added for
/// [`KeyringId::local`] land in the fixed `openpgp-*-keys` lists.
pub struct LegacyFixture {
    snapshot: LegacySnapshot,
    local: KeyringId,
}

impl Default for LegacyFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyFixture {
    pub fn new() -> Self {
        Self::with_local_keyring(KeyringId::local())
    }

    pub fn with_local_keyring(local: KeyringId) -> Self {
        Self {
            snapshot: LegacySnapshot::new(),
            local,
        }
    }

    /// Add an entry to the multi-keyring aggregate.
    pub fn keyring_attr(mut self, keyring_id: &str, primary_key: Option<&str>) -> Self {
        let mut aggregate = match self.snapshot.get(LEGACY_KEYRING_ATTR) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        aggregate.insert(keyring_id.to_string(), json!({ "primary_key": primary_key }));
        self.snapshot
            .insert(LEGACY_KEYRING_ATTR, Value::Object(aggregate));
        self
    }

    /// Set `general.primary_key` in the preferences aggregate.
    pub fn preferences_primary_key(mut self, primary_key: &str) -> Self {
        self.snapshot.insert(
            LEGACY_PREFERENCES,
            json!({ "general": { "primary_key": primary_key } }),
        );
        self
    }

    /// Public keys of the local keyring.
    pub fn public_keys(self, keys: Vec<String>) -> Self {
        let local = self.local.clone();
        self.keyring_keys(local.as_str(), KeyType::Public, keys)
    }

    /// Private keys of the local keyring.
    pub fn private_keys(self, keys: Vec<String>) -> Self {
        let local = self.local.clone();
        self.keyring_keys(local.as_str(), KeyType::Private, keys)
    }

    pub fn keyring_keys(mut self, keyring_id: &str, key_type: KeyType, keys: Vec<String>) -> Self {
        let name = key_list_name(keyring_id, &self.local, key_type);
        let list = keys.into_iter().map(Value::String).collect();
        self.snapshot.insert(name, Value::Array(list));
        self
    }

    /// Store an arbitrary value, for malformed-data cases.
    pub fn raw(mut self, key: &str, value: Value) -> Self {
        self.snapshot.insert(key, value);
        self
    }

    pub fn build(self) -> LegacySnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystore_store::legacy::{LEGACY_LOCAL_PRIVATE_KEYS, LEGACY_LOCAL_PUBLIC_KEYS};

    #[test]
    fn local_keys_use_fixed_lists() {
        let snapshot = LegacyFixture::new()
            .public_keys(vec!["p".into()])
            .private_keys(vec!["s".into()])
            .build();
        assert_eq!(snapshot.get(LEGACY_LOCAL_PUBLIC_KEYS), Some(json!(["p"])));
        assert_eq!(snapshot.get(LEGACY_LOCAL_PRIVATE_KEYS), Some(json!(["s"])));
    }

    #[test]
    fn aggregate_accumulates() {
        let snapshot = LegacyFixture::new()
            .keyring_attr("a", Some("k1"))
            .keyring_attr("b", None)
            .build();
        assert_eq!(
            snapshot.get(LEGACY_KEYRING_ATTR),
            Some(json!({ "a": { "primary_key": "k1" }, "b": { "primary_key": null } }))
        );
    }
}
