use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Failed to read spreadsheet: {0}")]
    MalformedInput(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Unparseable date {value:?} in row {row}")]
    InvalidDate { row: usize, value: String },

    #[error("Invalid number {value:?} in column {column}, row {row}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Amount out of range: {0}")]
    AmountOverflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl TallyError {
    /// Stable label for the error kind, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::MissingColumn(_) => "missing_column",
            Self::Persistence(_) => "persistence",
            Self::InvalidDate { .. } => "invalid_date",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::AmountOverflow(_) => "amount_overflow",
            Self::Io(_) => "io",
            Self::Settings(_) => "settings",
            Self::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
