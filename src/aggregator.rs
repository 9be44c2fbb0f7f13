use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{Result, TallyError};
use crate::models::{AggregateRow, NormalizedRow};

/// Keep card payments only and sum their total cost per (month, description, currency).
///
/// Rows with a blank description or currency have no group to land in and are
/// dropped, as are payments not yet completed. Output is sorted by the grouping key.
/// A group total outside the decimal range is an error.
pub fn aggregate(rows: &[NormalizedRow], card_payment_label: &str) -> Result<Vec<AggregateRow>> {
    let mut groups: BTreeMap<(String, String, String), Decimal> = BTreeMap::new();
    let mut kept = 0usize;
    let mut ungrouped = 0usize;
    let mut pending = 0usize;

    for row in rows.iter().filter(|r| r.tx_type == card_payment_label) {
        let Some(month_year) = row.month_year.as_ref() else {
            pending += 1;
            continue;
        };
        if row.description.is_empty() || row.currency.is_empty() {
            ungrouped += 1;
            continue;
        }
        kept += 1;
        let total = groups
            .entry((
                month_year.clone(),
                row.description.clone(),
                row.currency.clone(),
            ))
            .or_default();
        *total = total.checked_add(row.total_cost).ok_or_else(|| {
            TallyError::AmountOverflow(format!(
                "total for {:?} in {month_year} ({})",
                row.description, row.currency
            ))
        })?;
    }

    debug!(
        input = rows.len(),
        kept,
        ungrouped,
        pending,
        groups = groups.len(),
        "aggregated card payments"
    );

    Ok(groups
        .into_iter()
        .map(|((month_year, description, currency), total_amount)| AggregateRow {
            month_year,
            description,
            currency,
            total_amount,
        })
        .collect())
}

/// Distinct month buckets, ascending.
pub fn months(rows: &[AggregateRow]) -> Vec<String> {
    let mut months: Vec<String> = rows.iter().map(|r| r.month_year.clone()).collect();
    months.sort();
    months.dedup();
    months
}
