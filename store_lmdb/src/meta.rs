//! LMDB implementation of MetaStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use keystore_store::meta::MetaStore;
use keystore_store::StoreError;
use keystore_types::SchemaVersion;

use crate::LmdbError;

pub(crate) const META_DB: &str = "meta";

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

pub(crate) fn read_schema_version(
    meta_db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
) -> Result<SchemaVersion, LmdbError> {
    match meta_db.get(txn, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption("schema_version has unexpected byte length".to_string())
            })?;
            Ok(SchemaVersion::from_le_bytes(arr))
        }
        None => Ok(SchemaVersion::UNINITIALIZED),
    }
}

pub(crate) fn write_schema_version(
    meta_db: &Database<Bytes, Bytes>,
    wtxn: &mut RwTxn,
    version: SchemaVersion,
) -> Result<(), LmdbError> {
    meta_db.put(wtxn, SCHEMA_VERSION_KEY, &version.to_le_bytes()[..])?;
    Ok(())
}

impl MetaStore for LmdbMetaStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("meta key '{}'", key)))?;
        Ok(val.to_vec())
    }

    fn delete_meta(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_schema_version(&self) -> Result<SchemaVersion, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(read_schema_version(&self.meta_db, &rtxn)?)
    }

    fn set_schema_version(&self, version: SchemaVersion) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        write_schema_version(&self.meta_db, &mut wtxn, version)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn meta_roundtrip_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        let meta = env.meta_store();

        meta.put_meta("owner", b"alice").unwrap();
        assert_eq!(meta.get_meta("owner").unwrap(), b"alice");

        meta.delete_meta("owner").unwrap();
        assert!(matches!(meta.get_meta("owner"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn schema_version_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        let meta = env.meta_store();

        assert_eq!(meta.get_schema_version().unwrap(), SchemaVersion::UNINITIALIZED);
        meta.set_schema_version(SchemaVersion::new(1)).unwrap();
        assert_eq!(meta.get_schema_version().unwrap(), SchemaVersion::new(1));
        assert_eq!(env.schema_version().unwrap(), SchemaVersion::new(1));
    }

    #[test]
    fn malformed_schema_version_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        env.meta_store()
            .put_meta("schema_version", b"\x01")
            .unwrap();
        assert!(matches!(env.schema_version(), Err(LmdbError::Corruption(_))));
    }
}
