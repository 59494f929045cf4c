//! LMDB database integrity checks.
//!
//! Run after migration or on demand to detect corruption early: counts the
//! entries of every expected database and verifies that each secondary
//! index agrees with its object store.

use std::collections::HashSet;
use std::path::Path;

use heed::types::Bytes;
use heed::Env;

use keystore_store::schema::KEYS_STORE;

use crate::keystore::KeyStore;
use crate::meta::META_DB;
use crate::object_store::index_db_name;
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

fn expected_databases() -> Vec<String> {
    let mut names = vec![
        META_DB.to_string(),
        keystore_store::schema::KEYRING_ATTR_STORE.to_string(),
        KEYS_STORE.to_string(),
    ];
    for index in keystore_store::schema::KEYS_STORE_DEF.indexes {
        names.push(index_db_name(KEYS_STORE, index.name));
    }
    names
}

fn count_databases(env: &Env, report: &mut IntegrityReport) -> Result<(), LmdbError> {
    let rtxn = env.read_txn()?;
    for db_name in expected_databases() {
        match env.open_database::<Bytes, Bytes>(&rtxn, Some(db_name.as_str())) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }
    Ok(())
}

/// Check a migrated store.
///
/// Read failures are recorded in the report rather than causing a hard
/// error; only failing to start a read transaction is returned as `Err`.
pub fn check_integrity(store: &KeyStore) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let env = store.environment().env();
    count_databases(env, &mut report)?;

    let rtxn = env.read_txn()?;
    for object_store in store.object_stores() {
        let records = object_store.count(&rtxn)?;
        for index in object_store.index_names() {
            let entries = object_store.index_entries(&rtxn, index)?;
            let mut seen = HashSet::with_capacity(entries.len());
            for primary_key in &entries {
                if !object_store.contains(&rtxn, primary_key)? {
                    report.errors.push(format!(
                        "index '{}.{}' points at missing record {:02x?}",
                        object_store.name(),
                        index,
                        primary_key
                    ));
                }
                seen.insert(primary_key.as_slice());
            }
            if entries.len() as u64 != records || seen.len() != entries.len() {
                report.errors.push(format!(
                    "index '{}.{}' has {} entries for {} records",
                    object_store.name(),
                    index,
                    entries.len(),
                    records
                ));
            }
        }
    }

    tracing::debug!(
        databases = report.databases_checked,
        entries = report.total_entries,
        errors = report.errors.len(),
        "integrity check finished"
    );
    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::{id_key, index_key};
    use crate::{MigrationEngine, StoreOptions};
    use keystore_crypto::KeyRecordExtractor;
    use keystore_nullables::{LegacyFixture, NullOpenPgp};
    use keystore_types::{KeyType, SchemaVersion};

    fn migrated(dir: &Path) -> KeyStore {
        let legacy = LegacyFixture::new()
            .public_keys(vec![NullOpenPgp::armor("aa01", KeyType::Public)])
            .private_keys(vec![NullOpenPgp::armor("bb02", KeyType::Private)])
            .build();
        MigrationEngine::default()
            .run(
                &StoreOptions::new(dir),
                SchemaVersion::new(1),
                &legacy,
                &KeyRecordExtractor::new(NullOpenPgp),
            )
            .unwrap()
    }

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("nonexistent")).is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn migrated_store_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let store = migrated(dir.path());
        let report = check_integrity(&store).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.databases_checked, 6);
        // 2 records, 3 index entries each, 1 keyring, plus meta entries.
        assert!(report.total_entries >= 9);
    }

    #[test]
    fn dangling_index_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = migrated(dir.path());

        let keys = store.object_stores()[1];
        let fingerprint = &keys.indexes[1];
        let env = store.environment().env();
        let mut wtxn = env.write_txn().unwrap();
        let missing = id_key(99);
        fingerprint
            .db
            .put(&mut wtxn, &index_key(b"ffff", &missing), &missing)
            .unwrap();
        wtxn.commit().unwrap();

        let report = check_integrity(&store).unwrap();
        assert!(!report.is_healthy());
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("keys.fingerprint") && e.contains("missing record")));
    }
}
