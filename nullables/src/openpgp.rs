//! Nullable OpenPGP backend: fingerprints are written into the armor.

use keystore_crypto::{OpenPgpBackend, ParseError};
use keystore_types::{Fingerprint, KeyType};

const FINGERPRINT_HEADER: &str = "Fingerprint: ";

/// A deterministic OpenPGP backend for testing.
///
/// Accepts only text produced by [`NullOpenPgp::armor`] and reports the
/// fingerprint embedded in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOpenPgp;

impl NullOpenPgp {
    /// Fake armored key carrying `fingerprint`.
    pub fn armor(fingerprint: &str, key_type: KeyType) -> String {
        let block = match key_type {
            KeyType::Public => "PUBLIC",
            KeyType::Private => "PRIVATE",
        };
        format!(
            "-----BEGIN PGP {block} KEY BLOCK-----\n\
             {FINGERPRINT_HEADER}{fingerprint}\n\
             -----END PGP {block} KEY BLOCK-----\n"
        )
    }
}

impl OpenPgpBackend for NullOpenPgp {
    type Key = String;

    fn parse_armored(&self, text: &str) -> Result<String, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        if !text.starts_with("-----BEGIN PGP ") {
            return Err(ParseError::Malformed("missing armor header".into()));
        }
        text.lines()
            .find_map(|line| line.strip_prefix(FINGERPRINT_HEADER))
            .map(|fp| fp.trim().to_string())
            .ok_or_else(|| ParseError::Malformed("missing fingerprint line".into()))
    }

    fn fingerprint_of(&self, key: &String) -> Fingerprint {
        Fingerprint::from_hex(key)
    }
}
