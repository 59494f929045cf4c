//! Object stores on top of LMDB.
//!
//! An object store is one LMDB database of records plus one database per
//! secondary index. Records are bincode-encoded. Primary keys are either the
//! bytes of an inline key-path field or a big-endian `u64` drawn from a
//! per-store generator kept in the metadata database.
//!
//! Index keys are `len(value) as u32 BE ++ value ++ primary key`, so a
//! prefix scan over `len ++ value` matches exactly one index value and never
//! a longer value that happens to share its leading bytes.
//!
//! LMDB rejects keys over 511 bytes. Key-path and index values longer than
//! [`MAX_RAW_VALUE`] are stored as their first [`DIGEST_PREFIX_LEN`] bytes
//! followed by a Blake2b-256 digest of the whole value; lookups re-check
//! the decoded record.

use std::borrow::Cow;
use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use keystore_crypto::blake2b_256;
use keystore_store::schema::{IndexDef, KeyPath, ObjectStoreDef};
use keystore_store::Indexed;

use crate::LmdbError;

const GENERATOR_PREFIX: &str = "autoinc:";

#[derive(Clone, Copy)]
pub(crate) struct IndexHandle {
    pub(crate) def: IndexDef,
    pub(crate) db: Database<Bytes, Bytes>,
}

/// Handles to the databases backing one object store.
#[derive(Clone)]
pub struct ObjectStore {
    def: ObjectStoreDef,
    data_db: Database<Bytes, Bytes>,
    pub(crate) indexes: Vec<IndexHandle>,
    meta_db: Database<Bytes, Bytes>,
}

pub(crate) fn index_db_name(store: &str, index: &str) -> String {
    format!("{store}.idx.{index}")
}

fn generator_key(store: &str) -> Vec<u8> {
    format!("{GENERATOR_PREFIX}{store}").into_bytes()
}

/// Key of an auto-increment record.
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decode an auto-increment primary key.
pub fn id_from_key(key: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("bad record id of {} bytes", key.len())))?;
    Ok(u64::from_be_bytes(arr))
}

/// Longest value stored verbatim in a key.
pub const MAX_RAW_VALUE: usize = 255;

/// Leading bytes kept from a value that is stored digested.
pub const DIGEST_PREFIX_LEN: usize = 224;

/// Key bytes for a key-path or index value, at most `MAX_RAW_VALUE + 1` long.
///
/// Verbatim values are at most `MAX_RAW_VALUE` bytes and digested ones are
/// exactly one byte longer, so the two forms never coincide.
pub(crate) fn bounded_value(value: &[u8]) -> Cow<'_, [u8]> {
    if value.len() <= MAX_RAW_VALUE {
        return Cow::Borrowed(value);
    }
    let mut out = Vec::with_capacity(DIGEST_PREFIX_LEN + 32);
    out.extend_from_slice(&value[..DIGEST_PREFIX_LEN]);
    out.extend_from_slice(&blake2b_256(value));
    Cow::Owned(out)
}

/// Primary key of a record in an inline-keyed store.
pub(crate) fn inline_key_for(value: &[u8]) -> Vec<u8> {
    bounded_value(value).into_owned()
}

pub(crate) fn index_prefix(value: &[u8]) -> Vec<u8> {
    let stored = bounded_value(value);
    let mut prefix = Vec::with_capacity(4 + stored.len());
    prefix.extend_from_slice(&(value.len() as u32).to_be_bytes());
    prefix.extend_from_slice(&stored);
    prefix
}

pub(crate) fn index_key(value: &[u8], primary_key: &[u8]) -> Vec<u8> {
    let mut key = index_prefix(value);
    key.extend_from_slice(primary_key);
    key
}

/// Smallest key greater than every key starting with `prefix`, or `None`
/// if the prefix is all `0xFF`.
fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < 0xFF {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

fn prefix_scan(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
    let upper = increment_prefix(prefix);
    let bounds = (
        Bound::Included(prefix),
        match upper.as_deref() {
            Some(upper) => Bound::Excluded(upper),
            None => Bound::Unbounded,
        },
    );
    let mut results = Vec::new();
    for result in db.range(txn, &bounds)? {
        let (key, val) = result?;
        results.push((key.to_vec(), val.to_vec()));
    }
    Ok(results)
}

impl ObjectStore {
    /// Create the databases of `def` inside `wtxn`.
    pub(crate) fn create(
        env: &Env,
        wtxn: &mut RwTxn,
        meta_db: Database<Bytes, Bytes>,
        def: ObjectStoreDef,
    ) -> Result<Self, LmdbError> {
        let data_db = env.create_database::<Bytes, Bytes>(wtxn, Some(def.name))?;
        let mut indexes = Vec::with_capacity(def.indexes.len());
        for index in def.indexes {
            let name = index_db_name(def.name, index.name);
            let db = env.create_database::<Bytes, Bytes>(wtxn, Some(name.as_str()))?;
            indexes.push(IndexHandle { def: *index, db });
        }
        tracing::debug!(store = def.name, indexes = indexes.len(), "created object store");
        Ok(Self {
            def,
            data_db,
            indexes,
            meta_db,
        })
    }

    /// Open the databases of an existing object store.
    pub(crate) fn open(
        env: &Env,
        txn: &RoTxn,
        meta_db: Database<Bytes, Bytes>,
        def: ObjectStoreDef,
    ) -> Result<Self, LmdbError> {
        let data_db = env
            .open_database::<Bytes, Bytes>(txn, Some(def.name))?
            .ok_or_else(|| LmdbError::MissingObjectStore(def.name.to_string()))?;
        let mut indexes = Vec::with_capacity(def.indexes.len());
        for index in def.indexes {
            let name = index_db_name(def.name, index.name);
            let db = env
                .open_database::<Bytes, Bytes>(txn, Some(name.as_str()))?
                .ok_or_else(|| LmdbError::MissingObjectStore(name.clone()))?;
            indexes.push(IndexHandle { def: *index, db });
        }
        Ok(Self {
            def,
            data_db,
            indexes,
            meta_db,
        })
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn def(&self) -> &ObjectStoreDef {
        &self.def
    }

    fn index(&self, name: &str) -> Result<&IndexHandle, LmdbError> {
        self.indexes
            .iter()
            .find(|i| i.def.name == name)
            .ok_or_else(|| LmdbError::UnknownIndex {
                store: self.def.name.to_string(),
                index: name.to_string(),
            })
    }

    fn inline_key<T: Indexed>(&self, field: &str, record: &T) -> Result<Vec<u8>, LmdbError> {
        record
            .key_path_value(field)
            .map(|value| inline_key_for(&value))
            .ok_or_else(|| LmdbError::MissingKeyPath {
                store: self.def.name.to_string(),
                field: field.to_string(),
            })
    }

    fn next_id(&self, wtxn: &mut RwTxn) -> Result<u64, LmdbError> {
        let gen_key = generator_key(self.def.name);
        let next = match self.meta_db.get(wtxn, &gen_key)? {
            Some(bytes) => id_from_key(bytes)?,
            None => 1,
        };
        let after = next
            .checked_add(1)
            .ok_or_else(|| LmdbError::KeyGeneratorExhausted(self.def.name.to_string()))?;
        self.meta_db.put(wtxn, &gen_key, &id_key(after))?;
        Ok(next)
    }

    fn write_indexes<T: Indexed>(
        &self,
        wtxn: &mut RwTxn,
        primary_key: &[u8],
        record: &T,
    ) -> Result<(), LmdbError> {
        for index in &self.indexes {
            let Some(value) = record.index_value(index.def.name) else {
                continue;
            };
            if index.def.unique {
                let taken = prefix_scan(&index.db, wtxn, &index_prefix(&value))?
                    .into_iter()
                    .any(|(_, pk)| pk != primary_key);
                if taken {
                    return Err(LmdbError::Duplicate {
                        store: format!("{}.{}", self.def.name, index.def.name),
                    });
                }
            }
            index
                .db
                .put(wtxn, &index_key(&value, primary_key), primary_key)?;
        }
        Ok(())
    }

    fn remove_indexes<T: Indexed>(
        &self,
        wtxn: &mut RwTxn,
        primary_key: &[u8],
        record: &T,
    ) -> Result<(), LmdbError> {
        for index in &self.indexes {
            if let Some(value) = record.index_value(index.def.name) {
                index.db.delete(wtxn, &index_key(&value, primary_key))?;
            }
        }
        Ok(())
    }

    /// Insert a new record and return its primary key.
    ///
    /// Fails with [`LmdbError::Duplicate`] if a record with the same key
    /// already exists.
    pub fn add<T>(&self, wtxn: &mut RwTxn, record: &T) -> Result<Vec<u8>, LmdbError>
    where
        T: Serialize + Indexed,
    {
        let primary_key = match self.def.key_path {
            KeyPath::Inline(field) => self.inline_key(field, record)?,
            KeyPath::AutoIncrement => id_key(self.next_id(wtxn)?).to_vec(),
        };
        if self.data_db.get(wtxn, &primary_key)?.is_some() {
            return Err(LmdbError::Duplicate {
                store: self.def.name.to_string(),
            });
        }
        let bytes = bincode::serialize(record)?;
        self.data_db.put(wtxn, &primary_key, &bytes)?;
        self.write_indexes(wtxn, &primary_key, record)?;
        Ok(primary_key)
    }

    /// Insert or replace a record in an inline-keyed store.
    pub fn put<T>(&self, wtxn: &mut RwTxn, record: &T) -> Result<Vec<u8>, LmdbError>
    where
        T: Serialize + DeserializeOwned + Indexed,
    {
        let KeyPath::Inline(field) = self.def.key_path else {
            return Err(LmdbError::MissingKeyPath {
                store: self.def.name.to_string(),
                field: "<auto-increment>".to_string(),
            });
        };
        let primary_key = self.inline_key(field, record)?;
        if let Some(old) = self.get::<T>(wtxn, &primary_key)? {
            self.remove_indexes(wtxn, &primary_key, &old)?;
        }
        let bytes = bincode::serialize(record)?;
        self.data_db.put(wtxn, &primary_key, &bytes)?;
        self.write_indexes(wtxn, &primary_key, record)?;
        Ok(primary_key)
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        txn: &RoTxn,
        primary_key: &[u8],
    ) -> Result<Option<T>, LmdbError> {
        match self.data_db.get(txn, primary_key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, txn: &RoTxn, primary_key: &[u8]) -> Result<bool, LmdbError> {
        Ok(self.data_db.get(txn, primary_key)?.is_some())
    }

    /// Delete a record and its index entries. Returns `false` if absent.
    pub fn delete<T>(&self, wtxn: &mut RwTxn, primary_key: &[u8]) -> Result<bool, LmdbError>
    where
        T: DeserializeOwned + Indexed,
    {
        let Some(old) = self.get::<T>(wtxn, primary_key)? else {
            return Ok(false);
        };
        self.remove_indexes(wtxn, primary_key, &old)?;
        self.data_db.delete(wtxn, primary_key)?;
        Ok(true)
    }

    /// Every record in primary-key order.
    pub fn get_all<T: DeserializeOwned>(
        &self,
        txn: &RoTxn,
    ) -> Result<Vec<(Vec<u8>, T)>, LmdbError> {
        let mut results = Vec::new();
        for result in self.data_db.iter(txn)? {
            let (key, bytes) = result?;
            results.push((key.to_vec(), bincode::deserialize(bytes)?));
        }
        Ok(results)
    }

    /// Records whose `index` value equals `value`, in primary-key order.
    pub fn index_get_all<T: DeserializeOwned + Indexed>(
        &self,
        txn: &RoTxn,
        index: &str,
        value: &[u8],
    ) -> Result<Vec<(Vec<u8>, T)>, LmdbError> {
        let handle = self.index(index)?;
        let mut results = Vec::new();
        for (_, primary_key) in prefix_scan(&handle.db, txn, &index_prefix(value))? {
            let record: T = self.get(txn, &primary_key)?.ok_or_else(|| {
                LmdbError::Corruption(format!(
                    "index '{}.{}' points at missing record",
                    self.def.name, index
                ))
            })?;
            // Digested values can only match by prefix and hash.
            if record.index_value(index).as_deref() != Some(value) {
                continue;
            }
            results.push((primary_key, record));
        }
        Ok(results)
    }

    pub fn count(&self, txn: &RoTxn) -> Result<u64, LmdbError> {
        Ok(self.data_db.len(txn)?)
    }

    pub fn index_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.indexes.iter().map(|i| i.def.name)
    }

    /// Primary keys referenced by every entry of `index`.
    pub fn index_entries(&self, txn: &RoTxn, index: &str) -> Result<Vec<Vec<u8>>, LmdbError> {
        let handle = self.index(index)?;
        let mut results = Vec::new();
        for result in handle.db.iter(txn)? {
            let (_, primary_key) = result?;
            results.push(primary_key.to_vec());
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use keystore_store::schema::{KEYRING_ATTR_STORE_DEF, KEYS_STORE_DEF, INDEX_KEYRING_ID};
    use keystore_types::{Fingerprint, KeyRecord, KeyType, KeyringAttributes, KeyringId};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 4 * 1024 * 1024).unwrap();
        (dir, env)
    }

    fn create(env: &LmdbEnvironment, def: ObjectStoreDef) -> ObjectStore {
        let mut wtxn = env.env().write_txn().unwrap();
        let store = ObjectStore::create(env.env(), &mut wtxn, env.meta_db, def).unwrap();
        wtxn.commit().unwrap();
        store
    }

    fn key(keyring: &str, fp: &str) -> KeyRecord {
        KeyRecord {
            armored: format!("armored {fp}"),
            keyring_id: KeyringId::new(keyring).unwrap(),
            fingerprint: Fingerprint::from_hex(fp),
            key_type: KeyType::Public,
        }
    }

    #[test]
    fn bounded_value_keeps_short_values() {
        let short = vec![b'a'; MAX_RAW_VALUE];
        assert_eq!(bounded_value(&short).as_ref(), short.as_slice());

        let long = vec![b'a'; 619];
        let stored = bounded_value(&long);
        assert_eq!(stored.len(), MAX_RAW_VALUE + 1);
        assert_eq!(&stored[..DIGEST_PREFIX_LEN], &long[..DIGEST_PREFIX_LEN]);
        assert_ne!(bounded_value(&vec![b'a'; 620]), stored);
    }

    #[test]
    fn long_values_fit_in_keys() {
        let (_dir, env) = temp_env();
        let attrs_store = create(&env, KEYRING_ATTR_STORE_DEF);
        let keys = create(&env, KEYS_STORE_DEF);

        // Same leading bytes, so only the digest tells them apart.
        let long_a = format!("{}|a", "x".repeat(615));
        let long_b = format!("{}|b", "x".repeat(615));
        let mut wtxn = env.env().write_txn().unwrap();
        for id in [&long_a, &long_b] {
            let attrs = KeyringAttributes::new(KeyringId::new(id.as_str()).unwrap(), None);
            attrs_store.add(&mut wtxn, &attrs).unwrap();
        }
        keys.add(&mut wtxn, &key(&long_a, "01")).unwrap();
        keys.add(&mut wtxn, &key(&long_b, "02")).unwrap();
        wtxn.commit().unwrap();

        let rtxn = env.env().read_txn().unwrap();
        let stored: KeyringAttributes = attrs_store
            .get(&rtxn, &inline_key_for(long_a.as_bytes()))
            .unwrap()
            .unwrap();
        assert_eq!(stored.keyring_id.as_str(), long_a);
        assert_eq!(attrs_store.count(&rtxn).unwrap(), 2);

        let hits = keys
            .index_get_all::<KeyRecord>(&rtxn, INDEX_KEYRING_ID, long_b.as_bytes())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.fingerprint.as_str(), "02");
    }

    #[test]
    fn increment_prefix_carries() {
        assert_eq!(increment_prefix(&[1, 2]), Some(vec![1, 3]));
        assert_eq!(increment_prefix(&[1, 0xFF]), Some(vec![2]));
        assert_eq!(increment_prefix(&[0xFF, 0xFF]), None);
    }

    #[test]
    fn auto_increment_starts_at_one_and_never_reuses() {
        let (_dir, env) = temp_env();
        let store = create(&env, KEYS_STORE_DEF);

        let mut wtxn = env.env().write_txn().unwrap();
        let a = id_from_key(&store.add(&mut wtxn, &key("work", "aa")).unwrap()).unwrap();
        let b = id_from_key(&store.add(&mut wtxn, &key("work", "bb")).unwrap()).unwrap();
        assert_eq!((a, b), (1, 2));

        assert!(store.delete::<KeyRecord>(&mut wtxn, &id_key(b)).unwrap());
        let c = id_from_key(&store.add(&mut wtxn, &key("work", "cc")).unwrap()).unwrap();
        assert_eq!(c, 3);
        wtxn.commit().unwrap();
    }

    #[test]
    fn index_lookup_is_exact() {
        let (_dir, env) = temp_env();
        let store = create(&env, KEYS_STORE_DEF);

        let mut wtxn = env.env().write_txn().unwrap();
        store.add(&mut wtxn, &key("A", "01")).unwrap();
        store.add(&mut wtxn, &key("AB", "02")).unwrap();
        store.add(&mut wtxn, &key("A", "03")).unwrap();
        wtxn.commit().unwrap();

        let rtxn = env.env().read_txn().unwrap();
        let hits: Vec<KeyRecord> = store
            .index_get_all::<KeyRecord>(&rtxn, INDEX_KEYRING_ID, b"A")
            .unwrap()
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|r| r.keyring_id.as_str() == "A"));
    }

    #[test]
    fn delete_removes_index_entries() {
        let (_dir, env) = temp_env();
        let store = create(&env, KEYS_STORE_DEF);

        let mut wtxn = env.env().write_txn().unwrap();
        let pk = store.add(&mut wtxn, &key("work", "aa")).unwrap();
        assert!(store.delete::<KeyRecord>(&mut wtxn, &pk).unwrap());
        assert!(!store.delete::<KeyRecord>(&mut wtxn, &pk).unwrap());
        wtxn.commit().unwrap();

        let rtxn = env.env().read_txn().unwrap();
        assert_eq!(store.count(&rtxn).unwrap(), 0);
        for index in store.index_names() {
            assert!(store.index_entries(&rtxn, index).unwrap().is_empty());
        }
    }

    #[test]
    fn inline_add_rejects_duplicates_and_put_replaces() {
        let (_dir, env) = temp_env();
        let store = create(&env, KEYRING_ATTR_STORE_DEF);
        let work = KeyringId::new("work").unwrap();

        let mut wtxn = env.env().write_txn().unwrap();
        store
            .add(&mut wtxn, &KeyringAttributes::new(work.clone(), None))
            .unwrap();
        let dup = store.add(&mut wtxn, &KeyringAttributes::new(work.clone(), None));
        assert!(matches!(dup, Err(LmdbError::Duplicate { .. })));

        store
            .put(&mut wtxn, &KeyringAttributes::new(work.clone(), Some("k1".into())))
            .unwrap();
        wtxn.commit().unwrap();

        let rtxn = env.env().read_txn().unwrap();
        let attrs: KeyringAttributes = store.get(&rtxn, b"work").unwrap().unwrap();
        assert_eq!(attrs.primary_key_id.as_deref(), Some("k1"));
        assert_eq!(store.count(&rtxn).unwrap(), 1);
    }

    #[test]
    fn unknown_index_is_an_error() {
        let (_dir, env) = temp_env();
        let store = create(&env, KEYS_STORE_DEF);
        let rtxn = env.env().read_txn().unwrap();
        let err = store
            .index_get_all::<KeyRecord>(&rtxn, "nope", b"x")
            .unwrap_err();
        assert!(matches!(err, LmdbError::UnknownIndex { .. }));
    }

    #[test]
    fn open_missing_store_fails() {
        let (_dir, env) = temp_env();
        let rtxn = env.env().read_txn().unwrap();
        let err = ObjectStore::open(env.env(), &rtxn, env.meta_db, KEYS_STORE_DEF).err();
        assert!(matches!(err, Some(LmdbError::MissingObjectStore(_))));
    }
}
