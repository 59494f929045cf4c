//! Turns armored key text into structured key records.

use keystore_types::{Fingerprint, KeyRecord, KeyType, KeyringId};

use crate::{OpenPgpBackend, ParseError};

/// Result of a successful extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedKey {
    pub fingerprint: Fingerprint,
    pub parsed_ok: bool,
}

/// Derives key records from armored text through an [`OpenPgpBackend`].
#[derive(Clone, Debug, Default)]
pub struct KeyRecordExtractor<B> {
    backend: B,
}

impl<B: OpenPgpBackend> KeyRecordExtractor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Parse `armored` and compute its primary-key fingerprint.
    pub fn extract(&self, armored: &str) -> Result<ExtractedKey, ParseError> {
        let key = self.backend.parse_armored(armored)?;
        let fingerprint = self.backend.fingerprint_of(&key);
        if fingerprint.is_empty() {
            return Err(ParseError::NoPrimaryKey);
        }
        Ok(ExtractedKey {
            fingerprint,
            parsed_ok: true,
        })
    }

    /// Build the record for `armored` owned by `keyring_id`.
    ///
    /// The armored text is stored verbatim; `key_type` comes from the list the
    /// blob was read from, not from the parsed packet.
    pub fn record(
        &self,
        armored: &str,
        keyring_id: &KeyringId,
        key_type: KeyType,
    ) -> Result<KeyRecord, ParseError> {
        let extracted = self.extract(armored)?;
        Ok(KeyRecord {
            armored: armored.to_string(),
            keyring_id: keyring_id.clone(),
            fingerprint: extracted.fingerprint,
            key_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats the whole input as the fingerprint.
    struct EchoBackend;

    impl OpenPgpBackend for EchoBackend {
        type Key = String;

        fn parse_armored(&self, text: &str) -> Result<String, ParseError> {
            if text.starts_with('!') {
                return Err(ParseError::Malformed("bang".into()));
            }
            Ok(text.to_string())
        }

        fn fingerprint_of(&self, key: &String) -> Fingerprint {
            Fingerprint::from_hex(key)
        }
    }

    #[test]
    fn extract_returns_backend_fingerprint() {
        let extractor = KeyRecordExtractor::new(EchoBackend);
        let out = extractor.extract("ABCD").unwrap();
        assert_eq!(out.fingerprint.as_str(), "abcd");
        assert!(out.parsed_ok);
    }

    #[test]
    fn empty_fingerprint_is_no_primary_key() {
        let extractor = KeyRecordExtractor::new(EchoBackend);
        assert_eq!(extractor.extract(""), Err(ParseError::NoPrimaryKey));
    }

    #[test]
    fn backend_error_propagates() {
        let extractor = KeyRecordExtractor::new(EchoBackend);
        assert!(matches!(
            extractor.extract("!oops"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn record_keeps_armored_text_and_owner() {
        let extractor = KeyRecordExtractor::new(EchoBackend);
        let keyring = KeyringId::new("work").unwrap();
        let rec = extractor.record("beef", &keyring, KeyType::Private).unwrap();
        assert_eq!(rec.armored, "beef");
        assert_eq!(rec.keyring_id, keyring);
        assert_eq!(rec.key_type, KeyType::Private);
        assert_eq!(rec.fingerprint.as_str(), "beef");
    }
}
