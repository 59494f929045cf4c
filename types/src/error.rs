//! Error type for constructing validated keystore values.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("keyring id must not be empty")]
    EmptyKeyringId,

    #[error("invalid key type: {0} (expected \"public\" or \"private\")")]
    InvalidKeyType(String),
}
