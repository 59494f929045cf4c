//! OpenPGP backend on top of the `pgp` crate.

use pgp::composed::signed_key::{SignedPublicKey, SignedSecretKey};
use pgp::types::KeyTrait;
use pgp::Deserializable;

use keystore_types::Fingerprint;

use crate::{OpenPgpBackend, ParseError};

/// A transferable key as read from armor.
#[derive(Debug)]
pub enum ParsedKey {
    Public(SignedPublicKey),
    Secret(SignedSecretKey),
}

impl ParsedKey {
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

/// Production [`OpenPgpBackend`].
///
/// Accepts both public and private key blocks. Only the first key of a
/// multi-key block is considered.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpgpBackend;

impl RpgpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OpenPgpBackend for RpgpBackend {
    type Key = ParsedKey;

    fn parse_armored(&self, text: &str) -> Result<ParsedKey, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let public_err = match SignedPublicKey::from_string(text) {
            Ok((key, _headers)) => return Ok(ParsedKey::Public(key)),
            Err(e) => e,
        };

        match SignedSecretKey::from_string(text) {
            Ok((key, _headers)) => Ok(ParsedKey::Secret(key)),
            Err(secret_err) => {
                tracing::trace!(%public_err, %secret_err, "armored key rejected by both parsers");
                Err(ParseError::Malformed(public_err.to_string()))
            }
        }
    }

    fn fingerprint_of(&self, key: &ParsedKey) -> Fingerprint {
        let bytes = match key {
            ParsedKey::Public(k) => k.fingerprint(),
            ParsedKey::Secret(k) => k.fingerprint(),
        };
        Fingerprint::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_empty_error() {
        let backend = RpgpBackend::new();
        assert!(matches!(backend.parse_armored(""), Err(ParseError::Empty)));
        assert!(matches!(backend.parse_armored("  \n\t"), Err(ParseError::Empty)));
    }

    #[test]
    fn garbage_is_malformed() {
        let backend = RpgpBackend::new();
        assert!(matches!(
            backend.parse_armored("not a key at all"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_armor_is_malformed() {
        let backend = RpgpBackend::new();
        let text = "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmDMEatIf4hYJKwYBBAHaRw8B\n-----END PGP PUBLIC KEY BLOCK-----\n";
        assert!(matches!(
            backend.parse_armored(text),
            Err(ParseError::Malformed(_))
        ));
    }
}
