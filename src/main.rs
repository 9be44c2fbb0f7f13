mod aggregator;
mod cli;
mod db;
mod error;
mod fmt;
mod loader;
mod logging;
mod models;
mod normalizer;
mod processor;
mod reports;
mod settings;
mod upsert;

use clap::Parser;

use cli::import::ImportOptions;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let db = cli.db.as_deref();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir, db),
        Commands::Import {
            file,
            person,
            date_column,
            card_label,
            day_first,
            strict_numbers,
            format,
        } => {
            let opts = ImportOptions {
                date_column,
                card_label,
                day_first,
                strict_numbers,
                format,
            };
            cli::import::run(&file, &person, &opts, db)
        }
        Commands::Report { month, person } => cli::report::run(month, person, db),
        Commands::People => cli::people::run(db),
    };

    if let Err(e) = result {
        tracing::debug!(kind = e.kind(), "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
