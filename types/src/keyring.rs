//! Keyring identity and per-keyring attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Identifier of the keyring that belongs to the local user.
///
/// Legacy storage keeps this keyring's keys under fixed names instead of
/// names derived from the keyring id.
pub const LOCAL_KEYRING_ID: &str = "localhost|#|mailvelope";

/// A non-empty keyring identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyringId(String);

impl KeyringId {
    /// Create a keyring id, rejecting the empty string.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(TypesError::EmptyKeyringId);
        }
        Ok(Self(s))
    }

    /// The id of the local user's keyring.
    pub fn local() -> Self {
        Self(LOCAL_KEYRING_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_KEYRING_ID
    }
}

impl fmt::Display for KeyringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for KeyringId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<KeyringId> for String {
    fn from(id: KeyringId) -> Self {
        id.0
    }
}

impl TryFrom<&str> for KeyringId {
    type Error = TypesError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

/// Attributes stored once per keyring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringAttributes {
    pub keyring_id: KeyringId,
    /// Id of the key used by default for signing; `None` if not configured.
    pub primary_key_id: Option<String>,
}

impl KeyringAttributes {
    pub fn new(keyring_id: KeyringId, primary_key_id: Option<String>) -> Self {
        Self {
            keyring_id,
            primary_key_id,
        }
    }
}
