//! Key records and the identifiers derived from key material.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{KeyringId, TypesError};

/// Whether a stored key carries secret material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Public,
    Private,
}

impl KeyType {
    pub const ALL: [KeyType; 2] = [KeyType::Public, KeyType::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(TypesError::InvalidKeyType(other.to_string())),
        }
    }
}

/// Hex fingerprint of a key's primary key material, always lowercase.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a fingerprint from a hex string, normalizing to lowercase.
    pub fn from_hex(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().trim().to_ascii_lowercase())
    }

    /// Build a fingerprint from raw fingerprint bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored key.
///
/// `(keyring_id, fingerprint, key_type)` is expected to be unique in practice
/// but the store does not enforce it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Armored serialization of the key, kept verbatim.
    pub armored: String,
    pub keyring_id: KeyringId,
    pub fingerprint: Fingerprint,
    pub key_type: KeyType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_type_parses_and_displays() {
        for kt in KeyType::ALL {
            assert_eq!(kt.as_str().parse::<KeyType>().unwrap(), kt);
        }
        assert_eq!(
            "secret".parse::<KeyType>(),
            Err(TypesError::InvalidKeyType("secret".to_string()))
        );
    }

    #[test]
    fn fingerprint_from_bytes_is_lower_hex() {
        let fp = Fingerprint::from_bytes(&[0xAB, 0x01, 0xff]);
        assert_eq!(fp.as_str(), "ab01ff");
    }

    #[test]
    fn fingerprint_from_hex_normalizes_case() {
        let fp = Fingerprint::from_hex("469C85552B8AB1C5DB6E092E34B587F286DBFD70");
        assert_eq!(fp.as_str(), "469c85552b8ab1c5db6e092e34b587f286dbfd70");
    }
}
