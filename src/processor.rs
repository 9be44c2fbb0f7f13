use sha2::{Digest, Sha256};
use tracing::info;

use crate::aggregator::aggregate;
use crate::db::SummaryStore;
use crate::error::{Result, TallyError};
use crate::loader::load_table;
use crate::normalizer::normalize;
use crate::settings::PipelineConfig;
use crate::upsert::{upsert_summaries, UpsertOutcome};

pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Turn one bank export into monthly summaries for `person_name`.
///
/// Load, normalize and aggregate happen entirely in memory; the store is only
/// touched once all of them succeed. `outcome.inserted` is the number of
/// summary rows written.
pub fn process_statement<S: SummaryStore>(
    content: &[u8],
    person_name: &str,
    store: &mut S,
    config: &PipelineConfig,
) -> Result<UpsertOutcome> {
    let person_name = person_name.trim();
    if person_name.is_empty() {
        return Err(TallyError::Other("person name is required".into()));
    }

    let table = load_table(content, config.input_format)?;
    let rows = normalize(&table, config)?;
    let aggregates = aggregate(&rows, &config.card_payment_label)?;
    let checksum = compute_checksum(content);
    let outcome = upsert_summaries(store, person_name, &checksum, &aggregates)?;

    info!(
        person = person_name,
        rows = rows.len(),
        inserted = outcome.inserted,
        deleted = outcome.deleted,
        months = %outcome.months.join(","),
        "processed statement"
    );
    Ok(outcome)
}
