//! Schema version registry.
//!
//! Each registered [`SchemaStep`] describes what has to exist once the store
//! reaches that version: the object stores (with their key paths and
//! indexes) created by the step, and an optional data migration that runs in
//! the same transaction. Steps are applied in ascending order starting from
//! the installed version.

use keystore_types::SchemaVersion;
use thiserror::Error;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Name of the persistent database (directory under the data dir).
pub const DB_NAME: &str = "keystore";

pub const KEYRING_ATTR_STORE: &str = "keyring-attributes";
pub const KEYS_STORE: &str = "keys";

pub const INDEX_KEYRING_ID: &str = "keyringId";
pub const INDEX_FINGERPRINT: &str = "fingerprint";
pub const INDEX_TYPE: &str = "type";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no upgrade path for schema version {requested}")]
    UnsupportedVersion { requested: u32 },
}

/// How an object store derives the primary key of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyPath {
    /// Key taken from the named field of the record.
    Inline(&'static str),
    /// Key generated by the store, starting at 1.
    AutoIncrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    pub unique: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectStoreDef {
    pub name: &'static str,
    pub key_path: KeyPath,
    pub indexes: &'static [IndexDef],
}

/// Data work attached to a schema step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataMigration {
    None,
    /// Import keyrings and keys from legacy flat storage.
    LegacyImport,
}

/// Transition from `version - 1` to `version`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchemaStep {
    pub version: SchemaVersion,
    /// Object stores created by this step, in creation order.
    pub object_stores: &'static [ObjectStoreDef],
    pub data: DataMigration,
}

const KEY_INDEXES: &[IndexDef] = &[
    IndexDef {
        name: INDEX_KEYRING_ID,
        unique: false,
    },
    IndexDef {
        name: INDEX_FINGERPRINT,
        unique: false,
    },
    IndexDef {
        name: INDEX_TYPE,
        unique: false,
    },
];

pub const KEYRING_ATTR_STORE_DEF: ObjectStoreDef = ObjectStoreDef {
    name: KEYRING_ATTR_STORE,
    key_path: KeyPath::Inline(INDEX_KEYRING_ID),
    indexes: &[],
};

pub const KEYS_STORE_DEF: ObjectStoreDef = ObjectStoreDef {
    name: KEYS_STORE,
    key_path: KeyPath::AutoIncrement,
    indexes: KEY_INDEXES,
};

const V1: SchemaStep = SchemaStep {
    version: SchemaVersion::new(1),
    object_stores: &[KEYRING_ATTR_STORE_DEF, KEYS_STORE_DEF],
    data: DataMigration::LegacyImport,
};

/// Ordered set of schema steps.
#[derive(Clone, Debug)]
pub struct SchemaVersionRegistry {
    steps: Vec<SchemaStep>,
}

impl SchemaVersionRegistry {
    /// Registry with every step the current code knows about.
    pub fn current() -> Self {
        Self::with_steps(vec![V1])
    }

    /// Registry over an explicit set of steps. Steps are sorted by version.
    pub fn with_steps(mut steps: Vec<SchemaStep>) -> Self {
        steps.sort_by_key(|s| s.version);
        Self { steps }
    }

    /// Highest registered version, or uninitialized if the registry is empty.
    pub fn latest(&self) -> SchemaVersion {
        self.steps
            .last()
            .map(|s| s.version)
            .unwrap_or(SchemaVersion::UNINITIALIZED)
    }

    pub fn step(&self, version: SchemaVersion) -> Option<&SchemaStep> {
        self.steps.iter().find(|s| s.version == version)
    }

    /// Fail unless `target` is a registered version.
    pub fn validate_target(&self, target: SchemaVersion) -> Result<(), SchemaError> {
        match self.step(target) {
            Some(_) => Ok(()),
            None => Err(SchemaError::UnsupportedVersion {
                requested: target.get(),
            }),
        }
    }

    /// Steps that take a store from `from` to `to`, in ascending order.
    ///
    /// Empty when `from >= to`. Fails if `to` is not registered or any
    /// intermediate version has no step.
    pub fn steps_between(
        &self,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> Result<Vec<&SchemaStep>, SchemaError> {
        self.validate_target(to)?;
        if from >= to {
            return Ok(Vec::new());
        }
        (from.get() + 1..=to.get())
            .map(|v| {
                self.step(SchemaVersion::new(v))
                    .ok_or(SchemaError::UnsupportedVersion { requested: v })
            })
            .collect()
    }
}

impl Default for SchemaVersionRegistry {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> SchemaVersion {
        SchemaVersion::new(n)
    }

    #[test]
    fn v1_from_empty_store() {
        let registry = SchemaVersionRegistry::current();
        let steps = registry.steps_between(v(0), v(1)).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].version, v(1));
        assert_eq!(steps[0].data, DataMigration::LegacyImport);
        let names: Vec<_> = steps[0].object_stores.iter().map(|s| s.name).collect();
        assert_eq!(names, vec![KEYRING_ATTR_STORE, KEYS_STORE]);
    }

    #[test]
    fn keys_store_has_three_non_unique_indexes() {
        assert_eq!(KEYS_STORE_DEF.key_path, KeyPath::AutoIncrement);
        let names: Vec<_> = KEYS_STORE_DEF.indexes.iter().map(|i| i.name).collect();
        assert_eq!(names, vec![INDEX_KEYRING_ID, INDEX_FINGERPRINT, INDEX_TYPE]);
        assert!(KEYS_STORE_DEF.indexes.iter().all(|i| !i.unique));
    }

    #[test]
    fn version_two_is_unsupported() {
        let registry = SchemaVersionRegistry::current();
        assert_eq!(
            registry.steps_between(v(0), v(2)),
            Err(SchemaError::UnsupportedVersion { requested: 2 })
        );
        assert!(registry.validate_target(v(0)).is_err());
    }

    #[test]
    fn already_current_has_no_steps() {
        let registry = SchemaVersionRegistry::current();
        assert!(registry.steps_between(v(1), v(1)).unwrap().is_empty());
    }

    #[test]
    fn gap_in_registry_is_unsupported() {
        let v3 = SchemaStep {
            version: v(3),
            object_stores: &[],
            data: DataMigration::None,
        };
        let registry = SchemaVersionRegistry::with_steps(vec![v3, V1]);
        assert_eq!(registry.latest(), v(3));
        assert_eq!(
            registry.steps_between(v(0), v(3)),
            Err(SchemaError::UnsupportedVersion { requested: 2 })
        );
    }

    #[test]
    fn steps_are_returned_in_ascending_order() {
        let v2 = SchemaStep {
            version: v(2),
            object_stores: &[],
            data: DataMigration::None,
        };
        let registry = SchemaVersionRegistry::with_steps(vec![v2, V1]);
        let versions: Vec<_> = registry
            .steps_between(v(0), v(2))
            .unwrap()
            .iter()
            .map(|s| s.version.get())
            .collect();
        assert_eq!(versions, vec![1, 2]);

        let versions: Vec<_> = registry
            .steps_between(v(1), v(2))
            .unwrap()
            .iter()
            .map(|s| s.version.get())
            .collect();
        assert_eq!(versions, vec![2]);
    }
}
