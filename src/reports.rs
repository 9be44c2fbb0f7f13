use std::collections::BTreeMap;

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::fetch_summaries;
use crate::error::{Result, TallyError};
use crate::models::MonthlySummary;

// ---------------------------------------------------------------------------
// Monthly report
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportFilter<'a> {
    pub month: Option<&'a str>,
    pub person: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub description: String,
    pub total_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct PersonReport {
    pub person_name: String,
    pub entries: Vec<ReportEntry>,
    /// One total per currency; amounts in different currencies are never added.
    pub totals: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone)]
pub struct MonthReport {
    pub month_year: String,
    pub people: Vec<PersonReport>,
}

fn person_report(
    month_year: &str,
    person_name: String,
    mut items: Vec<MonthlySummary>,
) -> Result<PersonReport> {
    items.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.description.cmp(&b.description))
    });
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for item in &items {
        let total = totals.entry(item.currency.clone()).or_default();
        *total = total.checked_add(item.total_amount).ok_or_else(|| {
            TallyError::AmountOverflow(format!(
                "{} total for {person_name} in {month_year}",
                item.currency
            ))
        })?;
    }
    Ok(PersonReport {
        person_name,
        entries: items
            .into_iter()
            .map(|s| ReportEntry {
                description: s.description,
                total_amount: s.total_amount,
                currency: s.currency,
            })
            .collect(),
        totals: totals.into_iter().collect(),
    })
}

/// Summaries grouped month (newest first) -> person (A-Z) -> entries (largest first).
pub fn monthly_report(conn: &Connection, filter: ReportFilter) -> Result<Vec<MonthReport>> {
    let summaries = fetch_summaries(conn, filter.person, filter.month)?;

    let mut by_month: BTreeMap<String, BTreeMap<String, Vec<MonthlySummary>>> = BTreeMap::new();
    for s in summaries {
        by_month
            .entry(s.month_year.clone())
            .or_default()
            .entry(s.person_name.clone())
            .or_default()
            .push(s);
    }

    by_month
        .into_iter()
        .rev()
        .map(|(month_year, people)| {
            let people = people
                .into_iter()
                .map(|(person, items)| person_report(&month_year, person, items))
                .collect::<Result<Vec<_>>>()?;
            Ok(MonthReport { month_year, people })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PersonStats {
    pub person_name: String,
    pub months: i64,
    pub summaries: i64,
    pub last_month: String,
}

pub fn list_people(conn: &Connection) -> Result<Vec<PersonStats>> {
    let mut stmt = conn.prepare(
        "SELECT person_name, count(DISTINCT month_year), count(*), max(month_year) \
         FROM monthly_summaries GROUP BY person_name ORDER BY person_name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PersonStats {
                person_name: row.get(0)?,
                months: row.get(1)?,
                summaries: row.get(2)?,
                last_month: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
