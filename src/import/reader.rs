//! Loading spreadsheet exports into loosely typed records.

use super::Record;
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Header name given to blank header cells, numbered `__EMPTY`,
/// `__EMPTY_1`, `__EMPTY_2`... in column order.
pub const BLANK_HEADER: &str = "__EMPTY";

/// Extensions [`load_records`] understands.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "json"];

/// Read every row of a `.csv` or `.json` export.
///
/// CSV: the first row names the fields and every non-empty cell becomes a
/// string value; empty cells are left out of the record. JSON: the file
/// must hold an array of objects.
///
/// # Errors
/// Returns `Err` if the file cannot be read or parsed, or
/// `Error::NotImplemented` for workbook formats and unknown extensions
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let records = match extension.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "xlsx" | "xls" => {
            return Err(Error::NotImplemented(format!(
                "{}: workbook formats are not read directly, export the sheet to CSV",
                path.display()
            )))
        }
        other => {
            return Err(Error::NotImplemented(format!(
                "{}: unsupported extension '{}'",
                path.display(),
                other
            )))
        }
    };

    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let raw_headers: Vec<String> = reader.byte_headers()?.iter().map(decode_cell).collect();
    let headers = normalize_headers(raw_headers.iter().map(String::as_str));

    let mut records = Vec::new();
    for row in reader.byte_records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(name, cell)| (name.clone(), Value::String(decode_cell(cell))))
            .collect();
        records.push(record);
    }
    Ok(records)
}

/// City exports are not always UTF-8; bytes that do not decode become U+FFFD.
fn decode_cell(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn load_json(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;

    let Value::Array(rows) = value else {
        return Err(Error::ImportError(format!(
            "{}: expected a JSON array of objects",
            path.display()
        )));
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(record) => Ok(record),
            _ => Err(Error::ImportError(format!(
                "{}: element {} is not an object",
                path.display(),
                i
            ))),
        })
        .collect()
}

/// Name blank headers `__EMPTY[_n]` and suffix repeated names `_1`, `_2`...
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut blanks = 0usize;

    raw.map(|name| {
        if name.is_empty() {
            let header = match blanks {
                0 => BLANK_HEADER.to_string(),
                n => format!("{}_{}", BLANK_HEADER, n),
            };
            blanks += 1;
            return header;
        }
        let count = seen.entry(name.to_string()).or_insert(0);
        let header = match *count {
            0 => name.to_string(),
            n => format!("{}_{}", name, n),
        };
        *count += 1;
        header
    })
    .collect()
}
