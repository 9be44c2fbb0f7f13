use std::io::Cursor;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{Result, TallyError};
use crate::models::{Cell, Table};
use crate::settings::InputFormat;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    if !serial.is_finite() {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(chrono::Duration::milliseconds(millis))
}

fn looks_like_workbook(content: &[u8]) -> bool {
    content.starts_with(ZIP_MAGIC) || content.starts_with(OLE_MAGIC)
}

/// Decode a spreadsheet buffer into a table. The first row supplies the column names.
pub fn load_table(content: &[u8], format: InputFormat) -> Result<Table> {
    let table = match format {
        InputFormat::Workbook => load_workbook(content)?,
        InputFormat::Csv => load_csv(content)?,
        InputFormat::Auto if looks_like_workbook(content) => load_workbook(content)?,
        InputFormat::Auto => load_csv(content)?,
    };
    debug!(
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded table"
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Workbook (xlsx, xls, ods)
// ---------------------------------------------------------------------------

fn convert_cell(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(ts) => Cell::DateTime(ts),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}

fn load_workbook(content: &[u8]) -> Result<Table> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(content.to_vec()))
        .map_err(|e| TallyError::MalformedInput(e.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TallyError::MalformedInput("workbook has no sheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| TallyError::MalformedInput(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| convert_cell(c).to_text()).collect(),
        None => return Err(TallyError::MalformedInput("no header row".into())),
    };
    let body = rows
        .map(|r| r.iter().map(convert_cell).collect())
        .collect();
    Ok(finish_table(headers, body))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv(content: &[u8]) -> Result<Table> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut headers: Option<Vec<String>> = None;
    let mut body = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TallyError::MalformedInput(e.to_string()))?;
        if headers.is_none() {
            headers = Some(record.iter().map(|f| f.trim().to_string()).collect());
            continue;
        }
        body.push(
            record
                .iter()
                .map(|f| {
                    if f.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(f.to_string())
                    }
                })
                .collect(),
        );
    }
    let headers = headers.ok_or_else(|| TallyError::MalformedInput("no header row".into()))?;
    Ok(finish_table(headers, body))
}

/// Pad short rows to the header width and drop blank trailing rows.
fn finish_table(headers: Vec<String>, mut rows: Vec<Vec<Cell>>) -> Table {
    let width = headers.len();
    for row in &mut rows {
        if row.len() < width {
            row.resize(width, Cell::Empty);
        }
    }
    while rows
        .last()
        .map_or(false, |r| r.iter().all(Cell::is_empty))
    {
        rows.pop();
    }
    Table { headers, rows }
}
