use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::{get_connection, init_db};
use crate::error::{Result, TallyError};
use crate::fmt::money;
use crate::reports::{self, ReportFilter};
use crate::settings::resolve_db_path;

use super::validate_month;

pub fn run(month: Option<String>, person: Option<String>, db_override: Option<&str>) -> Result<()> {
    if let Some(m) = &month {
        if !validate_month(m) {
            return Err(TallyError::Other(format!("invalid month {m:?}, expected YYYY-MM")));
        }
    }
    let conn = get_connection(&resolve_db_path(db_override))?;
    init_db(&conn)?;
    let report = reports::monthly_report(
        &conn,
        ReportFilter {
            month: month.as_deref(),
            person: person.as_deref(),
        },
    )?;

    if report.is_empty() {
        println!("No summaries found.");
        return Ok(());
    }

    for month in &report {
        println!("{}", month.month_year.bold());
        for person in &month.people {
            let mut table = Table::new();
            table.set_header(vec!["Description", "Amount"]);
            for entry in &person.entries {
                table.add_row(vec![
                    Cell::new(&entry.description),
                    Cell::new(money(entry.total_amount, &entry.currency)),
                ]);
            }
            for (currency, total) in &person.totals {
                let label = if total.is_sign_negative() {
                    "Total".red().bold()
                } else {
                    "Total".green().bold()
                };
                table.add_row(vec![Cell::new(label), Cell::new(money(*total, currency))]);
            }
            println!("{}\n{table}", person.person_name);
        }
        println!();
    }
    Ok(())
}
