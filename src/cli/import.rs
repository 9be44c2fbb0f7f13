use std::path::Path;

use colored::Colorize;

use crate::db::{get_connection, init_db, last_upload_checksum};
use crate::error::Result;
use crate::processor::{compute_checksum, process_statement};
use crate::settings::{load_settings, resolve_db_path, DateOrder, NumericPolicy, PipelineConfig};

pub struct ImportOptions {
    pub date_column: Option<String>,
    pub card_label: Option<String>,
    pub day_first: bool,
    pub strict_numbers: bool,
    pub format: Option<String>,
}

/// Command-line flags layered over the saved pipeline settings.
pub fn pipeline_config(base: PipelineConfig, opts: &ImportOptions) -> Result<PipelineConfig> {
    let mut config = base;
    if let Some(col) = &opts.date_column {
        config.date_column = col.clone();
    }
    if let Some(label) = &opts.card_label {
        config.card_payment_label = label.clone();
    }
    if opts.day_first {
        config.date_order = DateOrder::DayFirst;
    }
    if opts.strict_numbers {
        config.numeric_policy = NumericPolicy::Strict;
    }
    if let Some(format) = &opts.format {
        config.input_format = format.parse()?;
    }
    Ok(config)
}

pub fn run(file: &str, person: &str, opts: &ImportOptions, db_override: Option<&str>) -> Result<()> {
    let config = pipeline_config(load_settings().pipeline_config(), opts)?;
    let content = std::fs::read(Path::new(file))?;

    let mut conn = get_connection(&resolve_db_path(db_override))?;
    init_db(&conn)?;
    let repeat = last_upload_checksum(&conn, person.trim())?.as_deref()
        == Some(compute_checksum(&content).as_str());

    let outcome = process_statement(&content, person, &mut conn, &config)?;

    println!(
        "{}",
        format!("Successfully processed {} records for {}.", outcome.inserted, person.trim()).green()
    );
    if !outcome.months.is_empty() {
        println!("Months replaced: {}", outcome.months.join(", "));
    }
    if repeat {
        println!("{}", "Same file as the previous upload for this person.".dimmed());
    }
    Ok(())
}
