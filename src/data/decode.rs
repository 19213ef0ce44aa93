//! Upload decoder: turns uploaded bytes into a raw [`Table`].
//!
//! Workbooks go through `calamine` (first worksheet only); anything else is
//! treated as delimited text.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use crate::common::error::{PloidyError, PloidyResult};

use super::domain::{Cell, Table};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Container format of an upload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UploadFormat {
    Workbook,
    Delimited,
}

impl UploadFormat {
    /// Pick the format from the file name, falling back to magic bytes.
    pub fn detect(file_name: Option<&str>, bytes: &[u8]) -> Self {
        let ext = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => UploadFormat::Workbook,
            Some("csv" | "tsv" | "txt") => UploadFormat::Delimited,
            _ if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) => {
                UploadFormat::Workbook
            }
            _ => UploadFormat::Delimited,
        }
    }
}

/// Decode an upload into a raw table. The header row names the columns.
pub fn decode_upload(file_name: Option<&str>, bytes: &[u8]) -> PloidyResult<Table> {
    if bytes.is_empty() {
        return Err(PloidyError::decode("upload is empty"));
    }
    let format = UploadFormat::detect(file_name, bytes);
    debug!(?format, bytes = bytes.len(), "decoding upload");

    let (header, rows) = match format {
        UploadFormat::Workbook => read_workbook(bytes)?,
        UploadFormat::Delimited => read_delimited(bytes)?,
    };

    if header.is_empty() {
        return Err(PloidyError::decode("upload has no header row"));
    }
    if rows.is_empty() {
        return Err(PloidyError::decode("upload has no data rows"));
    }
    Ok(Table::from_rows(header, rows))
}

type Grid = (Vec<String>, Vec<Vec<Cell>>);

fn read_workbook(bytes: &[u8]) -> PloidyResult<Grid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| PloidyError::decode(format!("unreadable workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PloidyError::decode("workbook has no worksheets"))?
        .map_err(|e| PloidyError::decode(format!("unreadable worksheet: {e}")))?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => header_names(cells.iter().map(workbook_cell)),
        None => return Ok((Vec::new(), Vec::new())),
    };
    let body = rows
        .map(|cells| cells.iter().map(workbook_cell).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();
    Ok((header, body))
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) if v.is_finite() => Cell::Number(*v),
        Data::Float(_) => Cell::Empty,
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

fn read_delimited(bytes: &[u8]) -> PloidyResult<Grid> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| PloidyError::decode("delimited upload is not valid UTF-8"))?;
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(text);
    let decimal_comma = delimiter == b';';

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => {
            let record = record.map_err(|e| PloidyError::decode(format!("bad header: {e}")))?;
            header_names(record.iter().map(|f| Cell::Text(f.trim().to_string())))
        }
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut body = Vec::new();
    for (idx, record) in records.enumerate() {
        let record =
            record.map_err(|e| PloidyError::decode(format!("bad record at line {}: {e}", idx + 2)))?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| delimited_cell(field, decimal_comma))
            .collect();
        if !row.iter().all(Cell::is_empty) {
            body.push(row);
        }
    }
    Ok((header, body))
}

fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().next().unwrap_or_default();
    let semis = first.matches(';').count();
    let tabs = first.matches('\t').count();
    let commas = first.matches(',').count();
    if tabs > semis && tabs > commas {
        b'\t'
    } else if semis > commas {
        b';'
    } else {
        b','
    }
}

fn delimited_cell(field: &str, decimal_comma: bool) -> Cell {
    match Cell::from_text(field) {
        Cell::Text(text) if decimal_comma && text.contains(',') => {
            match Cell::from_text(&text.replace(',', ".")) {
                number @ Cell::Number(_) => number,
                _ => Cell::Text(text),
            }
        }
        cell => cell,
    }
}

fn header_names(cells: impl Iterator<Item = Cell>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(idx, cell)| match cell.as_text() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("Unnamed: {idx}"),
        })
        .collect()
}
