//! Read access to the legacy flat key-value storage.
//!
//! Before the structured store existed, keyrings and keys were persisted as
//! loose JSON values under well-known names:
//!
//! - `mailvelopeKeyringAttr`: `{ <keyringId>: { "primary_key": <id> }, ... }`
//! - `mailvelopePreferences`: `{ "general": { "primary_key": <id> }, ... }`
//! - `openpgp-public-keys` / `openpgp-private-keys`: armored keys of the
//!   local keyring
//! - `<keyringId>public-keys` / `<keyringId>private-keys`: armored keys of
//!   every other keyring
//!
//! This module only reads; nothing here ever writes legacy storage.

use std::path::Path;

use keystore_types::{KeyType, KeyringId};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const LEGACY_KEYRING_ATTR: &str = "mailvelopeKeyringAttr";
pub const LEGACY_PREFERENCES: &str = "mailvelopePreferences";
pub const LEGACY_LOCAL_PUBLIC_KEYS: &str = "openpgp-public-keys";
pub const LEGACY_LOCAL_PRIVATE_KEYS: &str = "openpgp-private-keys";

const PUBLIC_KEYS_SUFFIX: &str = "public-keys";
const PRIVATE_KEYS_SUFFIX: &str = "private-keys";

#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("failed to read legacy storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("legacy storage is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("legacy storage must be a JSON object at the top level")]
    NotAnObject,

    #[error("legacy value '{key}' has unexpected shape: expected {expected}")]
    UnexpectedShape { key: String, expected: &'static str },
}

/// Synchronous, read-only view of legacy storage.
pub trait LegacyAttributeSource {
    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Option<Value>;
}

impl<S: LegacyAttributeSource + ?Sized> LegacyAttributeSource for &S {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }
}

/// Legacy storage captured as one JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegacySnapshot {
    entries: Map<String, Value>,
}

impl LegacySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(s: &str) -> Result<Self, LegacyError> {
        match serde_json::from_str::<Value>(s)? {
            Value::Object(entries) => Ok(Self { entries }),
            _ => Err(LegacyError::NotAnObject),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LegacyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LegacyAttributeSource for LegacySnapshot {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }
}

/// Entries have been written with either spelling, sometimes both.
#[derive(Debug, Default, Deserialize)]
struct LegacyKeyringEntry {
    #[serde(default)]
    primary_key: Option<String>,
    #[serde(default, rename = "primaryKeyId")]
    primary_key_id: Option<String>,
}

impl LegacyKeyringEntry {
    fn primary_key(self) -> Option<String> {
        self.primary_key.or(self.primary_key_id)
    }
}

#[derive(Debug, Default, Deserialize)]
struct LegacyPreferences {
    #[serde(default)]
    general: LegacyGeneral,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyGeneral {
    #[serde(default)]
    primary_key: Option<String>,
}

/// One keyring as described by legacy storage.
///
/// `keyring_id` is kept raw: legacy data may contain ids that are not valid
/// [`KeyringId`]s, and the importer decides what to do with them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyKeyring {
    pub keyring_id: String,
    pub primary_key_id: Option<String>,
}

/// Which of the two known legacy shapes the storage has.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegacyLayout {
    /// The keyring-attribute aggregate exists and lists the local keyring;
    /// every keyring in it is migrated.
    MultiKeyring(Vec<LegacyKeyring>),
    /// Only the local keyring exists; its primary key comes from preferences.
    SingleKeyring(LegacyKeyring),
}

impl LegacyLayout {
    /// Decide the layout of `source`.
    ///
    /// Multi-keyring iff the aggregate is an object whose entry for
    /// `local_keyring` is truthy: present and not `null`, `false`, `0`
    /// or `""`.
    pub fn detect(source: &impl LegacyAttributeSource, local_keyring: &KeyringId) -> Self {
        if let Some(Value::Object(aggregate)) = source.get(LEGACY_KEYRING_ATTR) {
            let has_local = aggregate
                .get(local_keyring.as_str())
                .is_some_and(is_truthy);
            if has_local {
                let keyrings = aggregate
                    .into_iter()
                    .map(|(keyring_id, entry)| {
                        let entry: LegacyKeyringEntry = serde_json::from_value(entry)
                            .unwrap_or_else(|e| {
                                tracing::warn!(keyring = %keyring_id, error = %e, "ignoring malformed keyring attributes");
                                LegacyKeyringEntry::default()
                            });
                        LegacyKeyring {
                            keyring_id,
                            primary_key_id: entry.primary_key(),
                        }
                    })
                    .collect();
                return Self::MultiKeyring(keyrings);
            }
        }

        let prefs: LegacyPreferences = source
            .get(LEGACY_PREFERENCES)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        Self::SingleKeyring(LegacyKeyring {
            keyring_id: local_keyring.as_str().to_string(),
            primary_key_id: prefs.general.primary_key,
        })
    }

    pub fn keyrings(&self) -> &[LegacyKeyring] {
        match self {
            Self::MultiKeyring(keyrings) => keyrings,
            Self::SingleKeyring(keyring) => std::slice::from_ref(keyring),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Legacy storage name of a keyring's key list.
pub fn key_list_name(keyring_id: &str, local_keyring: &KeyringId, key_type: KeyType) -> String {
    if keyring_id == local_keyring.as_str() {
        match key_type {
            KeyType::Public => LEGACY_LOCAL_PUBLIC_KEYS.to_string(),
            KeyType::Private => LEGACY_LOCAL_PRIVATE_KEYS.to_string(),
        }
    } else {
        let suffix = match key_type {
            KeyType::Public => PUBLIC_KEYS_SUFFIX,
            KeyType::Private => PRIVATE_KEYS_SUFFIX,
        };
        format!("{keyring_id}{suffix}")
    }
}

/// Read the key list stored under `name`.
///
/// Absent and null values are empty lists. Elements are returned unchecked;
/// non-string elements are the caller's to skip.
pub fn read_key_list(
    source: &impl LegacyAttributeSource,
    name: &str,
) -> Result<Vec<Value>, LegacyError> {
    match source.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(LegacyError::UnexpectedShape {
            key: name.to_string(),
            expected: "array of armored keys",
        }),
    }
}
