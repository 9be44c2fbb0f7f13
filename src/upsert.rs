use tracing::{debug, info, warn};

use crate::aggregator::months;
use crate::db::{SummaryStore, UnitOfWork};
use crate::error::Result;
use crate::models::{AggregateRow, MonthlySummary, UploadRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub deleted: usize,
    pub months: Vec<String>,
}

fn apply<U: UnitOfWork>(
    unit: &mut U,
    person_name: &str,
    checksum: &str,
    rows: &[AggregateRow],
    months: &[String],
) -> Result<UpsertOutcome> {
    let mut deleted = 0usize;
    for month in months {
        let n = unit.delete_month(person_name, month)?;
        debug!(person = person_name, month = month.as_str(), deleted = n, "cleared month");
        deleted += n;
    }
    for row in rows {
        unit.insert_summary(&MonthlySummary::from_aggregate(person_name, row))?;
    }
    unit.record_upload(&UploadRecord {
        person_name: person_name.to_string(),
        checksum: checksum.to_string(),
        months: months.to_vec(),
        record_count: rows.len(),
    })?;
    Ok(UpsertOutcome {
        inserted: rows.len(),
        deleted,
        months: months.to_vec(),
    })
}

/// Replace the person's summaries for every month present in `rows`.
///
/// All deletes and inserts run in one unit of work: on any failure the store
/// is left as it was before the call. An empty aggregate touches nothing.
pub fn upsert_summaries<S: SummaryStore>(
    store: &mut S,
    person_name: &str,
    checksum: &str,
    rows: &[AggregateRow],
) -> Result<UpsertOutcome> {
    if rows.is_empty() {
        info!(person = person_name, "no card payments to store");
        return Ok(UpsertOutcome::default());
    }
    let months = months(rows);

    let mut unit = store.begin()?;
    match apply(&mut unit, person_name, checksum, rows, &months) {
        Ok(outcome) => {
            unit.commit()?;
            Ok(outcome)
        }
        Err(e) => {
            if let Err(rb) = unit.rollback() {
                warn!(error = %rb, "rollback failed");
            }
            Err(e)
        }
    }
}
