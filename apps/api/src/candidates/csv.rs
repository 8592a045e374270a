use std::collections::BTreeMap;

use tracing::debug;

use crate::candidates::errors::CsvError;

/// One source row: lower-cased header name → cell text.
pub type RawRow = BTreeMap<String, String>;

/// Parses comma-separated text with a mandatory header row.
///
/// Blank lines are ignored. Rows shorter than the header are padded with
/// empty cells, longer rows are cut at the header width. A double-quoted
/// cell may span lines.
pub fn parse_rows(text: &str) -> Result<Vec<RawRow>, CsvError> {
    let mut records = split_records(text.trim_start_matches('\u{feff}')).into_iter();

    let headers: Vec<String> = records
        .next()
        .ok_or(CsvError::EmptyInput)?
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for (record_no, cells) in records.enumerate() {
        if cells.len() != headers.len() {
            debug!(
                "CSV row {} has {} cells for {} headers; truncating positionally",
                record_no + 1,
                cells.len(),
                headers.len()
            );
        }

        let mut row = RawRow::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = cells.get(idx).map(|c| c.trim()).unwrap_or_default();
            // Repeated header: the first non-empty cell wins.
            match row.get(header) {
                Some(existing) if !existing.is_empty() => {}
                _ => {
                    row.insert(header.clone(), value.to_string());
                }
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CsvError::NoDataRows);
    }
    Ok(rows)
}

/// Splits text into records of cells. Commas separate cells and newlines
/// (LF or CRLF) separate records, except inside a double-quoted cell, where
/// `""` is a literal quote. A quote only opens a cell at its start. Blank
/// lines produce no record.
fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            '\n' if !in_quotes => end_record(&mut records, &mut cells, &mut current),
            _ => current.push(ch),
        }
    }
    end_record(&mut records, &mut cells, &mut current);
    records
}

fn end_record(records: &mut Vec<Vec<String>>, cells: &mut Vec<String>, current: &mut String) {
    if current.ends_with('\r') {
        current.pop();
    }
    cells.push(std::mem::take(current));
    let record = std::mem::take(cells);
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}
