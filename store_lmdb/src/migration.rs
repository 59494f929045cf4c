//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta database and
//! applies registered schema steps to bring an older store up to the
//! requested version. All steps of one run share a single write transaction:
//! either the store reaches the target version with its data imported, or
//! nothing changes.

use std::time::Instant;

use keystore_crypto::{KeyRecordExtractor, OpenPgpBackend};
use keystore_store::{DataMigration, LegacyAttributeSource, LegacyError, SchemaError, SchemaVersionRegistry};
use keystore_types::{KeyringId, SchemaVersion};
use thiserror::Error;

use crate::environment::{LmdbEnvironment, StoreOptions};
use crate::keystore::KeyStore;
use crate::legacy_import::{import_legacy, ImportSummary};
use crate::LmdbError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    UnsupportedVersion(#[from] SchemaError),

    #[error("secure storage unavailable: {0}")]
    StoreOpen(#[source] LmdbError),

    #[error("upgrade transaction aborted: {0}")]
    Store(#[from] LmdbError),

    #[error("legacy storage value '{key}' is malformed: {reason}")]
    LegacyFormat { key: String, reason: String },
}

impl From<LegacyError> for MigrationError {
    fn from(e: LegacyError) -> Self {
        match e {
            LegacyError::UnexpectedShape { key, expected } => MigrationError::LegacyFormat {
                key,
                reason: format!("expected {expected}"),
            },
            other => MigrationError::LegacyFormat {
                key: "<snapshot>".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// What one migration run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationReport {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    pub steps_applied: Vec<SchemaVersion>,
    pub import: Option<ImportSummary>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.steps_applied.is_empty()
    }
}

/// Opens the key store at a requested schema version, upgrading it first if
/// needed.
#[derive(Clone, Debug)]
pub struct MigrationEngine {
    registry: SchemaVersionRegistry,
    local_keyring: KeyringId,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new(KeyringId::local())
    }
}

impl MigrationEngine {
    pub fn new(local_keyring: KeyringId) -> Self {
        Self::with_registry(SchemaVersionRegistry::current(), local_keyring)
    }

    pub fn with_registry(registry: SchemaVersionRegistry, local_keyring: KeyringId) -> Self {
        Self {
            registry,
            local_keyring,
        }
    }

    pub fn registry(&self) -> &SchemaVersionRegistry {
        &self.registry
    }

    /// Open the store at `target`, migrating it if it is older.
    pub fn run<S, B>(
        &self,
        options: &StoreOptions,
        target: SchemaVersion,
        legacy: &S,
        extractor: &KeyRecordExtractor<B>,
    ) -> Result<KeyStore, MigrationError>
    where
        S: LegacyAttributeSource + ?Sized,
        B: OpenPgpBackend,
    {
        self.run_with_report(options, target, legacy, extractor)
            .map(|(store, _)| store)
    }

    /// Like [`MigrationEngine::run`], also returning what was done.
    pub fn run_with_report<S, B>(
        &self,
        options: &StoreOptions,
        target: SchemaVersion,
        legacy: &S,
        extractor: &KeyRecordExtractor<B>,
    ) -> Result<(KeyStore, MigrationReport), MigrationError>
    where
        S: LegacyAttributeSource + ?Sized,
        B: OpenPgpBackend,
    {
        // Nothing on disk may change for an unsupported target.
        self.registry.validate_target(target)?;

        let start = Instant::now();
        let env = LmdbEnvironment::open_with(options).map_err(MigrationError::StoreOpen)?;
        let installed = env.schema_version().map_err(MigrationError::StoreOpen)?;

        if installed >= target {
            if installed > target {
                tracing::warn!(%installed, %target, "store is newer than requested version, leaving it untouched");
            } else {
                tracing::info!(version = %installed, "key store schema is up to date");
            }
            let store = KeyStore::from_env(env)?;
            let report = MigrationReport {
                from: installed,
                to: installed,
                steps_applied: Vec::new(),
                import: None,
            };
            return Ok((store, report));
        }

        let steps = self.registry.steps_between(installed, target)?;
        tracing::info!(from = %installed, to = %target, steps = steps.len(), "migrating key store");

        let mut import = None;
        let mut steps_applied = Vec::with_capacity(steps.len());
        {
            let mut batch = env.write_batch()?;
            for step in steps {
                tracing::debug!(version = %step.version, "applying schema step");
                for def in step.object_stores {
                    batch.create_object_store(*def)?;
                }
                if step.data == DataMigration::LegacyImport {
                    import = Some(import_legacy(
                        &mut batch,
                        legacy,
                        extractor,
                        &self.local_keyring,
                    )?);
                }
                batch.set_schema_version(step.version)?;
                steps_applied.push(step.version);
            }
            batch.commit()?;
        }

        if let Some(summary) = &import {
            tracing::info!(
                keyrings = summary.keyrings,
                keys_imported = summary.keys_imported,
                keys_skipped = summary.keys_skipped,
                "legacy import committed"
            );
        }
        tracing::info!(
            version = %target,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "key store migration complete"
        );

        let store = KeyStore::from_env(env)?;
        let report = MigrationReport {
            from: installed,
            to: target,
            steps_applied,
            import,
        };
        Ok((store, report))
    }
}
