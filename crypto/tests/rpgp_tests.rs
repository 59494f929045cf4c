//! Extraction against real armored keys exported from GnuPG.

use keystore_crypto::{KeyRecordExtractor, OpenPgpBackend, ParseError, RpgpBackend};
use keystore_types::{KeyType, KeyringId};

const ALICE_PUBLIC: &str = include_str!("fixtures/alice_public.asc");
const ALICE_PRIVATE: &str = include_str!("fixtures/alice_private.asc");
const ALICE_FINGERPRINT: &str = "469c85552b8ab1c5db6e092e34b587f286dbfd70";

#[test]
fn public_key_fingerprint_matches_gnupg() {
    let extractor = KeyRecordExtractor::new(RpgpBackend::new());
    let out = extractor.extract(ALICE_PUBLIC).expect("public key parses");
    assert_eq!(out.fingerprint.as_str(), ALICE_FINGERPRINT);
    assert!(out.parsed_ok);
}

#[test]
fn private_key_fingerprint_matches_public() {
    let extractor = KeyRecordExtractor::new(RpgpBackend::new());
    let out = extractor.extract(ALICE_PRIVATE).expect("private key parses");
    assert_eq!(out.fingerprint.as_str(), ALICE_FINGERPRINT);
}

#[test]
fn private_block_parses_as_secret() {
    let backend = RpgpBackend::new();
    assert!(backend.parse_armored(ALICE_PRIVATE).unwrap().is_secret());
    assert!(!backend.parse_armored(ALICE_PUBLIC).unwrap().is_secret());
}

#[test]
fn record_built_from_real_key() {
    let extractor = KeyRecordExtractor::new(RpgpBackend::new());
    let keyring = KeyringId::local();
    let rec = extractor
        .record(ALICE_PUBLIC, &keyring, KeyType::Public)
        .expect("record");
    assert_eq!(rec.fingerprint.as_str(), ALICE_FINGERPRINT);
    assert_eq!(rec.armored, ALICE_PUBLIC);
    assert!(rec.keyring_id.is_local());
}

#[test]
fn malformed_key_is_recoverable_error() {
    let extractor = KeyRecordExtractor::new(RpgpBackend::new());
    let err = extractor.extract("-----BEGIN PGP PUBLIC KEY BLOCK-----\n\ngarbage\n-----END PGP PUBLIC KEY BLOCK-----\n");
    assert!(matches!(err, Err(ParseError::Malformed(_))));
}

#[test]
fn blank_input_is_empty_error() {
    let extractor = KeyRecordExtractor::new(RpgpBackend::new());
    assert!(matches!(extractor.extract(""), Err(ParseError::Empty)));
    assert!(matches!(extractor.extract("  \n\t"), Err(ParseError::Empty)));
}
