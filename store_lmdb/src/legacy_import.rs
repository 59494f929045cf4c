//! Legacy import: the data step of schema version 1.

use keystore_crypto::{KeyRecordExtractor, OpenPgpBackend};
use keystore_store::legacy::{key_list_name, read_key_list};
use keystore_store::{LegacyAttributeSource, LegacyLayout};
use keystore_types::{KeyType, KeyringAttributes, KeyringId};

use crate::migration::MigrationError;
use crate::write_batch::WriteBatch;

/// Outcome of one legacy import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub keyrings: usize,
    pub keys_imported: usize,
    pub keys_skipped: usize,
}

/// Copy keyrings and keys from `source` into the stores of `batch`.
///
/// Unparseable blobs and empty keyring ids are skipped; a key list with the
/// wrong shape aborts the import.
pub fn import_legacy<S, B>(
    batch: &mut WriteBatch<'_>,
    source: &S,
    extractor: &KeyRecordExtractor<B>,
    local_keyring: &KeyringId,
) -> Result<ImportSummary, MigrationError>
where
    S: LegacyAttributeSource + ?Sized,
    B: OpenPgpBackend,
{
    let layout = LegacyLayout::detect(&source, local_keyring);
    let multi = matches!(layout, LegacyLayout::MultiKeyring(_));
    tracing::debug!(multi_keyring = multi, keyrings = layout.keyrings().len(), "detected legacy layout");

    let mut summary = ImportSummary::default();
    for legacy in layout.keyrings() {
        let keyring_id = match KeyringId::new(legacy.keyring_id.as_str()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "skipping legacy keyring");
                continue;
            }
        };

        batch.add_keyring_attributes(&KeyringAttributes::new(
            keyring_id.clone(),
            legacy.primary_key_id.clone(),
        ))?;
        summary.keyrings += 1;

        for key_type in KeyType::ALL {
            let list = key_list_name(keyring_id.as_str(), local_keyring, key_type);
            for (position, item) in read_key_list(&source, &list)?.iter().enumerate() {
                let Some(armored) = item.as_str() else {
                    tracing::warn!(keyring = %keyring_id, %key_type, position, "skipping non-string key entry");
                    summary.keys_skipped += 1;
                    continue;
                };
                match extractor.record(armored, &keyring_id, key_type) {
                    Ok(record) => {
                        batch.add_key_record(&record)?;
                        summary.keys_imported += 1;
                    }
                    Err(e) => {
                        tracing::warn!(keyring = %keyring_id, %key_type, position, error = %e, "skipping unparseable key");
                        summary.keys_skipped += 1;
                    }
                }
            }
        }
    }
    Ok(summary)
}
