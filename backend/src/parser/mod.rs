//! Input tables for the offer pipeline.
//!
//! Reads the offers spreadsheet export into rows: one JSON object per record,
//! keyed by column header, columns kept in file order. Three inputs are supported:
//!
//! - **Spreadsheet** (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`): every sheet becomes a table
//! - **CSV** with encoding and delimiter auto-detection, exposed as one table
//! - **JSON workbook**: an object of named tables (`{"offers": [...]}`) or a bare array of rows
//!
//! Columns with an empty header are ignored; a repeated header is an error.

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::DATE_FORMAT;

/// File extensions read as spreadsheet workbooks.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Table name used when the input does not name its tables.
pub const DEFAULT_TABLE: &str = "offers";

/// Result of parsing a CSV with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records as JSON objects
    pub records: Vec<Value>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// A named table of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    /// Column names in first-seen order
    pub headers: Vec<String>,
    pub rows: Vec<Value>,
}

/// All tables read from one input file
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub tables: Vec<Table>,
    /// Encoding of a CSV source
    pub encoding: Option<String>,
    /// Delimiter of a CSV source
    pub delimiter: Option<char>,
}

impl Workbook {
    /// Wrap a parsed CSV as a single-table workbook.
    pub fn from_csv(parsed: ParseResult, table: &str) -> Self {
        Self {
            tables: vec![Table {
                name: table.to_string(),
                headers: parsed.headers,
                rows: parsed.records,
            }],
            encoding: Some(parsed.encoding),
            delimiter: Some(parsed.delimiter),
        }
    }

    /// Find a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using the given encoding, dropping a UTF-8 byte order mark.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => match String::from_utf8(bytes.to_vec()) {
            Ok(s) => s,
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the header line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

/// Check a header row: at least one named column, no name repeated.
fn check_headers(headers: &[String]) -> CsvResult<()> {
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut seen = HashSet::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        if !seen.insert(header.as_str()) {
            return Err(CsvError::DuplicateHeader(header.clone()));
        }
    }
    Ok(())
}

/// Named columns in order, dropping unnamed ones.
fn named_headers(headers: &[String]) -> Vec<String> {
    headers.iter().filter(|h| !h.is_empty()).cloned().collect()
}

/// Parse CSV text into JSON objects with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use ofertas::csv_to_json;
///
/// let csv = "nomeOferta;adesao\nPlano A;0\nPlano B;50";
/// let rows = csv_to_json(csv, ';').unwrap();
///
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1]["adesao"], "50");
/// ```
pub fn csv_to_json(csv: &str, delimiter: char) -> CsvResult<Vec<Value>> {
    if csv.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    parse_csv(csv.as_bytes(), delimiter).map(|(_, rows)| rows)
}

/// Parse CSV from a reader into headers and JSON objects.
///
/// Quoted fields may contain the delimiter. Cells are trimmed; blank lines are skipped;
/// short records are padded with empty strings.
pub fn parse_csv<R: Read>(reader: R, delimiter: char) -> CsvResult<(Vec<String>, Vec<Value>)> {
    if !delimiter.is_ascii() {
        return Err(CsvError::ParseError {
            line: 1,
            message: format!("delimiter '{}' is not ASCII", delimiter),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| to_parse_error(&e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    check_headers(&headers)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| to_parse_error(&e))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = record.get(i).unwrap_or("");
            obj.insert(header.clone(), Value::String(cell.to_string()));
        }
        rows.push(Value::Object(obj));
    }

    Ok((named_headers(&headers), rows))
}

fn to_parse_error(err: &csv::Error) -> CsvError {
    CsvError::ParseError {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}

/// Parse CSV bytes, detecting the encoding and (unless given) the delimiter.
pub fn parse_bytes_auto(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);

    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let (headers, records) = parse_csv(content.as_bytes(), delimiter)?;

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, delimiter)
}

/// Parse a JSON workbook.
///
/// An object maps table names to arrays of rows; a bare array is one table
/// named `default_table`.
pub fn parse_json_workbook(content: &str, default_table: &str) -> CsvResult<Workbook> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let tables = match serde_json::from_str::<Value>(content)? {
        Value::Array(rows) => vec![json_table(default_table, rows)],
        Value::Object(map) => map
            .into_iter()
            .map(|(name, value)| match value {
                Value::Array(rows) => Ok(json_table(&name, rows)),
                _ => Err(CsvError::InvalidWorkbook(format!(
                    "table '{}' is not an array of rows",
                    name
                ))),
            })
            .collect::<CsvResult<Vec<_>>>()?,
        _ => {
            return Err(CsvError::InvalidWorkbook(
                "expected an array of rows or an object of tables".to_string(),
            ))
        }
    };

    Ok(Workbook {
        tables,
        encoding: None,
        delimiter: None,
    })
}

fn json_table(name: &str, rows: Vec<Value>) -> Table {
    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    Table {
        name: name.to_string(),
        headers,
        rows,
    }
}

/// Read every sheet of a spreadsheet workbook, in workbook order.
///
/// The first non-empty row of a sheet is its header row; blank rows are
/// skipped and empty cells become `null`.
pub fn parse_spreadsheet<P: AsRef<Path>>(path: P) -> CsvResult<Workbook> {
    let mut sheets = open_workbook_auto(path.as_ref())?;

    let mut tables = Vec::new();
    for name in sheets.sheet_names() {
        let range = sheets.worksheet_range(&name)?;
        tables.push(sheet_table(&name, &range)?);
    }

    Ok(Workbook {
        tables,
        encoding: None,
        delimiter: None,
    })
}

fn sheet_table(name: &str, range: &Range<Data>) -> CsvResult<Table> {
    let mut lines = range.rows();

    let headers: Vec<String> = match lines.next() {
        Some(cells) => cells.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => {
            return Ok(Table {
                name: name.to_string(),
                headers: Vec::new(),
                rows: Vec::new(),
            })
        }
    };
    check_headers(&headers)?;

    let rows = lines
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            let obj: Map<String, Value> = headers
                .iter()
                .zip(cells)
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .collect();
            Value::Object(obj)
        })
        .collect();

    Ok(Table {
        name: name.to_string(),
        headers: named_headers(&headers),
        rows,
    })
}

/// Convert a spreadsheet cell to JSON.
///
/// Whole floats become integers, dates are rendered `DD/MM/YYYY`, errors and
/// empty cells are `null`.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) => Value::String(s.trim().to_string()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_value(*f),
        Data::DateTime(dt) => excel_date(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
    }
}

fn float_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Excel serial day (1900 date system) to `DD/MM/YYYY`.
fn excel_date(serial: f64) -> Value {
    if !serial.is_finite() || !(0.0..3_000_000.0).contains(&serial) {
        return Value::Null;
    }

    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.trunc() as i64)))
        .map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
        .unwrap_or(Value::Null)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Read an input file into a workbook.
///
/// Spreadsheets expose one table per sheet and `.json` files are read as
/// workbooks; anything else is CSV exposed under `table`.
pub fn read_workbook<P: AsRef<Path>>(
    path: P,
    table: &str,
    delimiter: Option<char>,
) -> CsvResult<Workbook> {
    let path = path.as_ref();

    if has_extension(path, &SPREADSHEET_EXTENSIONS) {
        parse_spreadsheet(path)
    } else if has_extension(path, &["json"]) {
        let content = std::fs::read_to_string(path)?;
        parse_json_workbook(&content, table)
    } else {
        let parsed = parse_csv_file_auto(path, delimiter)?;
        Ok(Workbook::from_csv(parsed, table))
    }
}
