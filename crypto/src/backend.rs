//! The OpenPGP capability the keystore depends on.

use keystore_types::Fingerprint;

use crate::ParseError;

/// Parses armored keys and derives their primary-key fingerprint.
///
/// Implementations must not panic on arbitrary input; every failure is a
/// [`ParseError`].
pub trait OpenPgpBackend {
    /// Parsed key representation.
    type Key;

    /// Parse a single armored key (public or secret).
    fn parse_armored(&self, text: &str) -> Result<Self::Key, ParseError>;

    /// Fingerprint of the key's primary key.
    fn fingerprint_of(&self, key: &Self::Key) -> Fingerprint;
}

impl<B: OpenPgpBackend + ?Sized> OpenPgpBackend for &B {
    type Key = B::Key;

    fn parse_armored(&self, text: &str) -> Result<Self::Key, ParseError> {
        (**self).parse_armored(text)
    }

    fn fingerprint_of(&self, key: &Self::Key) -> Fingerprint {
        (**self).fingerprint_of(key)
    }
}
