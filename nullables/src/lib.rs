//! Nullable infrastructure for deterministic testing.
//!
//! The external capabilities of the keystore (OpenPGP parsing, legacy
//! storage) are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod legacy;
pub mod openpgp;

pub use legacy::LegacyFixture;
pub use openpgp::NullOpenPgp;
