//! keystore: run the key store migration and inspect the migrated store.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use keystore_crypto::{KeyRecordExtractor, RpgpBackend};
use keystore_store::{KeyRecordStore, KeyringAttrStore, LegacySnapshot};
use keystore_store_lmdb::{check_data_dir, check_integrity, KeyStore, MigrationEngine};
use keystore_types::{Fingerprint, KeyRecord, KeyType, KeyringId};
use keystore_utils::{init_logging, LogFormat};

use crate::config::KeystoreConfig;

#[derive(Parser)]
#[command(name = "keystore", about = "Versioned local PGP key store")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "KEYSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the key store database.
    #[arg(long, env = "KEYSTORE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Id of the keyring that owns the fixed legacy key lists.
    #[arg(long, env = "KEYSTORE_LOCAL_KEYRING")]
    local_keyring: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "KEYSTORE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "KEYSTORE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Bring the store up to the target schema version, importing legacy data.
    Migrate {
        /// JSON snapshot of legacy storage.
        #[arg(long, env = "KEYSTORE_LEGACY_PATH")]
        legacy: Option<PathBuf>,

        /// Schema version to migrate to.
        #[arg(long, env = "KEYSTORE_TARGET_VERSION")]
        target: Option<u32>,
    },
    /// Print the schema version, store counts and an integrity report.
    Status,
    /// List keyrings and their primary keys.
    Keyrings,
    /// List key records (armored text is never printed).
    Keys {
        #[arg(long)]
        keyring: Option<String>,

        #[arg(long)]
        fingerprint: Option<String>,

        #[arg(long = "type")]
        key_type: Option<KeyType>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<KeystoreConfig> {
    let mut config = match &cli.config {
        Some(path) => KeystoreConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => KeystoreConfig::default(),
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(local) = &cli.local_keyring {
        config.local_keyring_id = local.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Command::Migrate { legacy, target } = &cli.command {
        if let Some(legacy) = legacy {
            config.legacy_path = Some(legacy.clone());
        }
        if let Some(target) = target {
            config.target_version = *target;
        }
    }
    Ok(config)
}

fn open_existing(config: &KeystoreConfig) -> anyhow::Result<KeyStore> {
    let options = config.store_options();
    if !options.db_path().join("data.mdb").exists() {
        bail!(
            "no key store at {}; run `keystore migrate` first",
            options.db_path().display()
        );
    }
    KeyStore::open(&options)
        .with_context(|| format!("opening key store at {}", options.db_path().display()))
}

fn migrate(config: &KeystoreConfig) -> anyhow::Result<()> {
    let options = config.store_options();
    check_data_dir(&options.db_path()).map_err(anyhow::Error::msg)?;

    let legacy = match &config.legacy_path {
        Some(path) => LegacySnapshot::from_json_file(path)
            .with_context(|| format!("reading legacy snapshot {}", path.display()))?,
        None => LegacySnapshot::new(),
    };
    let engine = MigrationEngine::new(config.local_keyring()?);
    let extractor = KeyRecordExtractor::new(RpgpBackend);

    let (_store, report) = engine
        .run_with_report(&options, config.target(), &legacy, &extractor)
        .context("key store migration failed")?;

    if report.is_noop() {
        println!("schema already at {}, nothing to do", report.from);
        return Ok(());
    }
    println!("migrated {} -> {}", report.from, report.to);
    if let Some(summary) = report.import {
        println!(
            "imported {} keys into {} keyrings ({} skipped)",
            summary.keys_imported, summary.keyrings, summary.keys_skipped
        );
    }
    Ok(())
}

fn status(config: &KeystoreConfig) -> anyhow::Result<()> {
    let store = open_existing(config)?;
    println!("schema version: {}", store.schema_version()?);
    println!("keyrings:       {}", store.keyring_attr_store().keyring_count()?);
    println!("keys:           {}", store.key_record_store().key_count()?);
    for key_type in KeyType::ALL {
        let n = store.key_record_store().keys_by_type(key_type)?.len();
        println!("  {:<14}{n}", key_type.as_str());
    }

    let report = check_integrity(&store)?;
    println!(
        "integrity:      {} databases, {} entries, {}",
        report.databases_checked,
        report.total_entries,
        if report.is_healthy() { "healthy" } else { "ERRORS" }
    );
    for error in &report.errors {
        println!("  {error}");
    }
    if !report.is_healthy() {
        bail!("integrity check found {} problems", report.errors.len());
    }
    Ok(())
}

fn keyrings(config: &KeystoreConfig) -> anyhow::Result<()> {
    let store = open_existing(config)?;
    for attrs in store.keyring_attr_store().iter_keyring_attributes()? {
        println!(
            "{}\t{}",
            attrs.keyring_id,
            attrs.primary_key_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn keys(
    config: &KeystoreConfig,
    keyring: Option<KeyringId>,
    fingerprint: Option<Fingerprint>,
    key_type: Option<KeyType>,
) -> anyhow::Result<()> {
    let store = open_existing(config)?;
    let records = store.key_record_store();
    let rows = match (&keyring, &fingerprint, key_type) {
        (Some(keyring), _, _) => records.keys_by_keyring(keyring)?,
        (None, Some(fingerprint), _) => records.keys_by_fingerprint(fingerprint)?,
        (None, None, Some(key_type)) => records.keys_by_type(key_type)?,
        (None, None, None) => records.iter_keys()?,
    };

    let matches = |record: &KeyRecord| {
        fingerprint.as_ref().map_or(true, |f| &record.fingerprint == f)
            && key_type.map_or(true, |t| record.key_type == t)
    };
    for (id, record) in rows.iter().filter(|(_, r)| matches(r)) {
        println!(
            "{id}\t{}\t{}\t{}",
            record.keyring_id, record.key_type, record.fingerprint
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    tracing::debug!(data_dir = %config.data_dir.display(), "loaded configuration");

    match cli.command {
        Command::Migrate { .. } => migrate(&config),
        Command::Status => status(&config),
        Command::Keyrings => keyrings(&config),
        Command::Keys {
            keyring,
            fingerprint,
            key_type,
        } => {
            let keyring = keyring
                .map(KeyringId::new)
                .transpose()
                .context("invalid --keyring")?;
            keys(&config, keyring, fingerprint.map(Fingerprint::from_hex), key_type)
        }
    }
}
