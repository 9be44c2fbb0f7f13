pub mod import;
pub mod init;
pub mod people;
pub mod report;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally", about = "Monthly card-spend summaries from bank exports.")]
pub struct Cli {
    /// Database file (default: <data_dir>/tally.db)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a bank export (XLSX/XLS/ODS/CSV) for a person, replacing their summaries for the months it covers.
    Import {
        /// Path to the export file
        file: String,
        /// Person the statement belongs to
        #[arg(long)]
        person: String,
        /// Header of the completion timestamp column
        #[arg(long = "date-column")]
        date_column: Option<String>,
        /// Transaction type label to keep
        #[arg(long = "card-label")]
        card_label: Option<String>,
        /// Read ambiguous dates like 01/02/2023 as day-first
        #[arg(long = "day-first")]
        day_first: bool,
        /// Fail on non-numeric amounts instead of treating them as zero
        #[arg(long = "strict-numbers")]
        strict_numbers: bool,
        /// Input format: auto, workbook, csv
        #[arg(long)]
        format: Option<String>,
    },
    /// Show monthly summaries grouped by month and person.
    Report {
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Only this person
        #[arg(long)]
        person: Option<String>,
    },
    /// List people with stored summaries.
    People,
}

pub(crate) fn validate_month(month: &str) -> bool {
    let parts: Vec<&str> = month.split('-').collect();
    parts.len() == 2
        && parts[0].len() == 4
        && parts[1].len() == 2
        && parts[0].parse::<i32>().is_ok()
        && parts[1].parse::<u32>().map_or(false, |m| (1..=12).contains(&m))
}
