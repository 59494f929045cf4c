//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use keystore_store::schema::DB_NAME;
use keystore_types::SchemaVersion;

use crate::meta::{read_schema_version, LmdbMetaStore, META_DB};
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Where and how to open the persistent store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    /// Directory holding the database; the environment lives in `data_dir/keystore`.
    pub data_dir: PathBuf,
    /// Maximum size of the memory map in bytes.
    pub map_size: usize,
    /// Maximum number of named databases.
    pub max_dbs: u32,
}

impl StoreOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Path of the LMDB environment directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_NAME)
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./keystore_data"),
            map_size: 64 * 1024 * 1024,
            max_dbs: 16,
        }
    }
}

/// Wraps the LMDB environment and the internal metadata database.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Only the metadata database is created here; object stores come from
    /// schema steps.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("cannot create {}: {}", path.display(), e)))?;

        // SAFETY: the environment is opened once per path by this process and
        // the data file is not truncated or remapped by anyone else.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, max_dbs, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            meta_db,
            path: path.to_path_buf(),
        })
    }

    /// Open the environment described by `options`.
    pub fn open_with(options: &StoreOptions) -> Result<Self, LmdbError> {
        Self::open(&options.db_path(), options.max_dbs, options.map_size)
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn shared_env(&self) -> Arc<Env> {
        Arc::clone(&self.env)
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: self.shared_env(),
            meta_db: self.meta_db,
        }
    }

    /// Installed schema version; uninitialized for a fresh environment.
    pub fn schema_version(&self) -> Result<SchemaVersion, LmdbError> {
        let rtxn = self.env.read_txn()?;
        read_schema_version(&self.meta_db, &rtxn)
    }

    /// Begin a write batch spanning every database in the environment.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, LmdbError> {
        WriteBatch::new(self)
    }
}
