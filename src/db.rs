use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{MonthlySummary, UploadRecord};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS monthly_summaries (
    id INTEGER PRIMARY KEY,
    person_name TEXT NOT NULL,
    month_year TEXT NOT NULL,
    description TEXT NOT NULL,
    total_amount TEXT NOT NULL,
    currency TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (person_name, month_year, description, currency)
);

CREATE INDEX IF NOT EXISTS idx_summaries_person_month
    ON monthly_summaries (person_name, month_year);

CREATE TABLE IF NOT EXISTS uploads (
    id INTEGER PRIMARY KEY,
    person_name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    months TEXT NOT NULL,
    record_count INTEGER NOT NULL,
    uploaded_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

/// Anything that can open an all-or-nothing scope over the summary table.
pub trait SummaryStore {
    type Unit<'a>: UnitOfWork
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Unit<'_>>;
}

/// Mutations applied inside one unit of work. Dropping an uncommitted unit
/// discards everything it did.
pub trait UnitOfWork {
    /// Remove every summary for the person and month, whatever its description or currency.
    fn delete_month(&mut self, person_name: &str, month_year: &str) -> Result<usize>;
    fn insert_summary(&mut self, summary: &MonthlySummary) -> Result<()>;
    fn record_upload(&mut self, upload: &UploadRecord) -> Result<()>;
    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}

pub struct SqliteUnit<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl SummaryStore for Connection {
    type Unit<'a> = SqliteUnit<'a>;

    fn begin(&mut self) -> Result<Self::Unit<'_>> {
        // IMMEDIATE takes the write lock up front so two uploads cannot interleave.
        let tx = self.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteUnit { tx })
    }
}

impl UnitOfWork for SqliteUnit<'_> {
    fn delete_month(&mut self, person_name: &str, month_year: &str) -> Result<usize> {
        let n = self.tx.execute(
            "DELETE FROM monthly_summaries WHERE person_name = ?1 AND month_year = ?2",
            rusqlite::params![person_name, month_year],
        )?;
        Ok(n)
    }

    fn insert_summary(&mut self, summary: &MonthlySummary) -> Result<()> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO monthly_summaries (person_name, month_year, description, total_amount, currency) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        stmt.execute(rusqlite::params![
            summary.person_name,
            summary.month_year,
            summary.description,
            summary.total_amount.to_string(),
            summary.currency,
        ])?;
        Ok(())
    }

    fn record_upload(&mut self, upload: &UploadRecord) -> Result<()> {
        self.tx.execute(
            "INSERT INTO uploads (person_name, checksum, months, record_count) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                upload.person_name,
                upload.checksum,
                upload.months.join(","),
                upload.record_count as i64,
            ],
        )?;
        Ok(())
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn decimal_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn summary_from_row(row: &rusqlite::Row) -> rusqlite::Result<MonthlySummary> {
    Ok(MonthlySummary {
        id: Some(row.get(0)?),
        person_name: row.get(1)?,
        month_year: row.get(2)?,
        description: row.get(3)?,
        total_amount: decimal_column(row, 4)?,
        currency: row.get(5)?,
    })
}

/// Stored summaries, optionally narrowed to a person and/or month, ordered by
/// month descending, then person, description and currency.
pub fn fetch_summaries(
    conn: &Connection,
    person_name: Option<&str>,
    month_year: Option<&str>,
) -> Result<Vec<MonthlySummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, person_name, month_year, description, total_amount, currency \
         FROM monthly_summaries \
         WHERE (?1 IS NULL OR person_name = ?1) AND (?2 IS NULL OR month_year = ?2) \
         ORDER BY month_year DESC, person_name, description, currency",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![person_name, month_year], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_summaries(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT count(*) FROM monthly_summaries", [], |r| r.get(0))?)
}

/// Checksum of the most recent upload for a person, if any.
pub fn last_upload_checksum(conn: &Connection, person_name: &str) -> Result<Option<String>> {
    let checksum = conn
        .query_row(
            "SELECT checksum FROM uploads WHERE person_name = ?1 ORDER BY id DESC LIMIT 1",
            [person_name],
            |r| r.get(0),
        )
        .optional()?;
    Ok(checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn summary(person: &str, month: &str, desc: &str, total: Decimal) -> MonthlySummary {
        MonthlySummary {
            id: None,
            person_name: person.to_string(),
            month_year: month.to_string(),
            description: desc.to_string(),
            total_amount: total,
            currency: "GBP".to_string(),
        }
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["monthly_summaries", "uploads"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_commit_persists_and_amounts_stay_exact() {
        let (_dir, mut conn) = test_db();
        let mut unit = conn.begin().unwrap();
        unit.insert_summary(&summary("Eva", "2023-01", "Transport", dec!(5.10))).unwrap();
        unit.commit().unwrap();

        let rows = fetch_summaries(&conn, Some("Eva"), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_amount, dec!(5.10));
        assert!(rows[0].id.is_some());
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let (_dir, mut conn) = test_db();
        {
            let mut unit = conn.begin().unwrap();
            unit.insert_summary(&summary("Eva", "2023-01", "Cafe", dec!(1))).unwrap();
        }
        assert_eq!(count_summaries(&conn).unwrap(), 0);
    }

    #[test]
    fn test_explicit_rollback() {
        let (_dir, mut conn) = test_db();
        let mut unit = conn.begin().unwrap();
        unit.insert_summary(&summary("Eva", "2023-01", "Cafe", dec!(1))).unwrap();
        unit.rollback().unwrap();
        assert_eq!(count_summaries(&conn).unwrap(), 0);
    }

    #[test]
    fn test_unique_constraint() {
        let (_dir, mut conn) = test_db();
        let mut unit = conn.begin().unwrap();
        unit.insert_summary(&summary("Eva", "2023-01", "Cafe", dec!(1))).unwrap();
        let err = unit
            .insert_summary(&summary("Eva", "2023-01", "Cafe", dec!(2)))
            .unwrap_err();
        assert_eq!(err.kind(), "persistence");
    }

    #[test]
    fn test_delete_month_scoped_to_person_and_month() {
        let (_dir, mut conn) = test_db();
        let mut unit = conn.begin().unwrap();
        unit.insert_summary(&summary("Eva", "2023-01", "Cafe", dec!(1))).unwrap();
        unit.insert_summary(&summary("Eva", "2023-01", "Rent", dec!(2))).unwrap();
        unit.insert_summary(&summary("Eva", "2023-02", "Cafe", dec!(3))).unwrap();
        unit.insert_summary(&summary("Tom", "2023-01", "Cafe", dec!(4))).unwrap();
        assert_eq!(unit.delete_month("Eva", "2023-01").unwrap(), 2);
        unit.commit().unwrap();

        assert_eq!(fetch_summaries(&conn, Some("Eva"), Some("2023-01")).unwrap().len(), 0);
        assert_eq!(fetch_summaries(&conn, Some("Eva"), Some("2023-02")).unwrap().len(), 1);
        assert_eq!(fetch_summaries(&conn, Some("Tom"), None).unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_summaries_orders_month_descending() {
        let (_dir, mut conn) = test_db();
        let mut unit = conn.begin().unwrap();
        unit.insert_summary(&summary("Eva", "2023-01", "Cafe", dec!(1))).unwrap();
        unit.insert_summary(&summary("Eva", "2023-03", "Cafe", dec!(1))).unwrap();
        unit.insert_summary(&summary("Amy", "2023-03", "Cafe", dec!(1))).unwrap();
        unit.commit().unwrap();

        let rows = fetch_summaries(&conn, None, None).unwrap();
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.month_year.as_str(), r.person_name.as_str()))
            .collect();
        assert_eq!(keys, vec![("2023-03", "Amy"), ("2023-03", "Eva"), ("2023-01", "Eva")]);
    }

    #[test]
    fn test_record_upload() {
        let (_dir, mut conn) = test_db();
        assert_eq!(last_upload_checksum(&conn, "Eva").unwrap(), None);
        let mut unit = conn.begin().unwrap();
        unit.record_upload(&UploadRecord {
            person_name: "Eva".into(),
            checksum: "abc".into(),
            months: vec!["2023-01".into(), "2023-02".into()],
            record_count: 3,
        })
        .unwrap();
        unit.commit().unwrap();
        assert_eq!(last_upload_checksum(&conn, "Eva").unwrap().as_deref(), Some("abc"));
        let months: String = conn
            .query_row("SELECT months FROM uploads", [], |r| r.get(0))
            .unwrap();
        assert_eq!(months, "2023-01,2023-02");
    }
}
