use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{Result, TallyError};
use crate::loader::excel_serial_to_datetime;
use crate::models::{Cell, NormalizedRow, Table};
use crate::settings::{DateOrder, NumericPolicy, PipelineConfig};

// ---------------------------------------------------------------------------
// Column aliases
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct AliasSpec {
    field: &'static str,
    aliases: &'static [&'static str],
    required: bool,
}

/// Canonical field -> accepted header labels, in preference order.
const COLUMN_ALIASES: &[AliasSpec] = &[
    AliasSpec {
        field: "Type",
        aliases: &["Type"],
        required: true,
    },
    AliasSpec {
        field: "Product",
        aliases: &["Product"],
        required: false,
    },
    AliasSpec {
        field: "Description",
        aliases: &["Description", "DateDescription"],
        required: true,
    },
    AliasSpec {
        field: "Amount",
        aliases: &["Amount"],
        required: true,
    },
    AliasSpec {
        field: "Fee",
        aliases: &["Fee"],
        required: false,
    },
    AliasSpec {
        field: "Currency",
        aliases: &["Currency"],
        required: true,
    },
];

/// Resolved column positions for one table.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    tx_type: usize,
    product: Option<usize>,
    description: usize,
    amount: usize,
    fee: Option<usize>,
    currency: usize,
    completed: usize,
}

fn resolve_alias(table: &Table, spec: &AliasSpec) -> Result<Option<usize>> {
    for alias in spec.aliases {
        if let Some(idx) = table.column_index(alias) {
            if *alias != spec.field {
                debug!(from = *alias, to = spec.field, "column alias applied");
            }
            return Ok(Some(idx));
        }
    }
    if spec.required {
        return Err(TallyError::MissingColumn(spec.field.to_string()));
    }
    Ok(None)
}

fn resolve_columns(table: &Table, date_column: &str) -> Result<ColumnMap> {
    // The completion date is checked first: without it nothing can be bucketed.
    let completed = table
        .column_index(date_column)
        .ok_or_else(|| TallyError::MissingColumn(date_column.to_string()))?;

    let mut found = [None; 6];
    for (slot, spec) in found.iter_mut().zip(COLUMN_ALIASES) {
        *slot = resolve_alias(table, spec)?;
    }
    let [tx_type, product, description, amount, fee, currency] = found;
    let required = |idx: Option<usize>, field: &str| {
        idx.ok_or_else(|| TallyError::MissingColumn(field.to_string()))
    };
    Ok(ColumnMap {
        tx_type: required(tx_type, "Type")?,
        product,
        description: required(description, "Description")?,
        amount: required(amount, "Amount")?,
        fee,
        currency: required(currency, "Currency")?,
        completed,
    })
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Parse a decimal string, plain or scientific.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn cell_to_decimal(cell: &Cell) -> std::result::Result<Decimal, String> {
    match cell {
        Cell::Empty => Ok(Decimal::ZERO),
        // Shortest round-trip text keeps 0.1 as 0.1 rather than its binary expansion.
        Cell::Number(n) => parse_decimal(&n.to_string()).ok_or_else(|| n.to_string()),
        Cell::Text(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Cell::Text(s) => parse_decimal(s).ok_or_else(|| s.trim().to_string()),
        Cell::DateTime(_) => Err(cell.to_text()),
    }
}

/// Numeric value of a cell under the given policy. Empty cells count as zero.
pub fn coerce_number(
    cell: &Cell,
    policy: NumericPolicy,
    column: &str,
    row: usize,
) -> Result<Decimal> {
    match cell_to_decimal(cell) {
        Ok(value) => Ok(value),
        Err(value) => match policy {
            NumericPolicy::CoerceToZero => {
                warn!(column, row, value = value.as_str(), "non-numeric value treated as zero");
                Ok(Decimal::ZERO)
            }
            NumericPolicy::Strict => Err(TallyError::InvalidNumber {
                column: column.to_string(),
                row,
                value,
            }),
        },
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d, %Y", "%b %d %Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// `A/B/YYYY`, `A.B.YYYY` or `A-B-YYYY`, optionally followed by a time.
fn parse_numeric_date(raw: &str, order: DateOrder) -> Option<NaiveDateTime> {
    let (date_part, time_part) = match raw.split_once(|c: char| c == ' ' || c == 'T') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (raw, None),
    };
    let sep = ['/', '.', '-']
        .into_iter()
        .find(|c| date_part.contains(*c))?;
    let parts: Vec<&str> = date_part.split(sep).collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    let a: u32 = parts[0].parse().ok()?;
    let b: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;

    let (month_first, day_first) = (
        NaiveDate::from_ymd_opt(y, a, b),
        NaiveDate::from_ymd_opt(y, b, a),
    );
    let date = match order {
        DateOrder::MonthFirst => month_first.or(day_first),
        DateOrder::DayFirst => day_first.or(month_first),
    }?;

    let time = match time_part {
        None | Some("") => NaiveTime::from_hms_opt(0, 0, 0)?,
        Some(t) => TIME_FORMATS
            .iter()
            .find_map(|f| NaiveTime::parse_from_str(t, f).ok())?,
    };
    Some(date.and_time(time))
}

/// Parse a completion timestamp written in any of the accepted layouts.
pub fn parse_timestamp(raw: &str, order: DateOrder) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt);
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return d.and_hms_opt(0, 0, 0);
    }
    parse_numeric_date(s, order)
}

fn cell_to_timestamp(cell: &Cell, order: DateOrder) -> Option<NaiveDateTime> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(serial) => excel_serial_to_datetime(*serial),
        Cell::Text(s) => parse_timestamp(s, order),
        Cell::Empty => None,
    }
}

pub fn month_bucket(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m").to_string()
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Clean every row of the table. Row numbers in errors are 1-based data rows.
pub fn normalize(table: &Table, config: &PipelineConfig) -> Result<Vec<NormalizedRow>> {
    let cols = resolve_columns(table, &config.date_column)?;
    let policy = config.numeric_policy;

    let mut rows = Vec::with_capacity(table.rows.len());
    for idx in 0..table.rows.len() {
        let row_no = idx + 1;
        let completed_cell = table.cell(idx, cols.completed);
        let completed_at = if completed_cell.is_empty() {
            debug!(row = row_no, "no completion date");
            None
        } else {
            let ts = cell_to_timestamp(completed_cell, config.date_order).ok_or_else(|| {
                TallyError::InvalidDate {
                    row: row_no,
                    value: completed_cell.to_text(),
                }
            })?;
            Some(ts)
        };

        let amount = coerce_number(table.cell(idx, cols.amount), policy, "Amount", row_no)?;
        let fee = match cols.fee {
            Some(col) => coerce_number(table.cell(idx, col), policy, "Fee", row_no)?,
            None => Decimal::ZERO,
        };
        let product = cols
            .product
            .map(|col| table.cell(idx, col).to_text())
            .filter(|p| !p.is_empty());
        let total_cost = amount.checked_add(fee).ok_or_else(|| {
            TallyError::AmountOverflow(format!("Amount + Fee in row {row_no}"))
        })?;

        rows.push(NormalizedRow {
            tx_type: table.cell(idx, cols.tx_type).to_raw_text(),
            product,
            month_year: completed_at.as_ref().map(month_bucket),
            completed_at,
            description: table.cell(idx, cols.description).to_text(),
            amount,
            fee,
            currency: table.cell(idx, cols.currency).to_text(),
            total_cost,
        });
    }
    debug!(rows = rows.len(), "normalized rows");
    Ok(rows)
}
