use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("duplicate key in object store '{store}'")]
    Duplicate { store: String },

    #[error("object store does not exist: {0}")]
    MissingObjectStore(String),

    #[error("object store '{store}' has no index '{index}'")]
    UnknownIndex { store: String, index: String },

    #[error("record for object store '{store}' has no value at key path '{field}'")]
    MissingKeyPath { store: String, field: String },

    #[error("key generator of object store '{0}' is exhausted")]
    KeyGeneratorExhausted(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<bincode::Error> for LmdbError {
    fn from(e: bincode::Error) -> Self {
        LmdbError::Serialization(e.to_string())
    }
}

impl From<LmdbError> for keystore_store::StoreError {
    fn from(e: LmdbError) -> Self {
        use keystore_store::StoreError;
        match e {
            LmdbError::NotFound(what) => StoreError::NotFound(what),
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            LmdbError::Duplicate { store } => StoreError::Duplicate(store),
            LmdbError::MissingObjectStore(name) => StoreError::MissingObjectStore(name),
            LmdbError::Corruption(msg) => StoreError::Corruption(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
