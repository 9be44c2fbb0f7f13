use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// One spreadsheet cell after decoding, independent of the source format.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form of the cell, trimmed. Numbers use their shortest representation.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Text form without trimming, for labels that must match exactly.
    pub fn to_raw_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            other => other.to_text(),
        }
    }
}

/// Row-oriented table with named columns, in source row order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }
}

/// A cleaned transaction row, ready for filtering and grouping.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub tx_type: String,
    pub product: Option<String>,
    /// `None` when the export has no completion date yet (pending rows).
    pub completed_at: Option<NaiveDateTime>,
    pub month_year: Option<String>,
    pub description: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub total_cost: Decimal,
}

/// One (month, description, currency) group with its summed total.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub month_year: String,
    pub description: String,
    pub currency: String,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub id: Option<i64>,
    pub person_name: String,
    pub month_year: String,
    pub description: String,
    pub total_amount: Decimal,
    pub currency: String,
}

impl MonthlySummary {
    pub fn from_aggregate(person_name: &str, row: &AggregateRow) -> Self {
        Self {
            id: None,
            person_name: person_name.to_string(),
            month_year: row.month_year.clone(),
            description: row.description.clone(),
            total_amount: row.total_amount,
            currency: row.currency.clone(),
        }
    }
}

/// History entry written alongside each successful upload.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub person_name: String,
    pub checksum: String,
    pub months: Vec<String>,
    pub record_count: usize,
}
