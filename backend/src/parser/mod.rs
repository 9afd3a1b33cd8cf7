//! Quote-aware CSV codec.
//!
//! Decoding is a character-level state machine over comma-separated text:
//! quoted cells may embed commas, line breaks and doubled `""` quotes.
//! Encoding always quotes every cell so that `decode(encode(x))` reproduces
//! the original string values.
//!
//! Byte input (uploads, files) that is not UTF-8 goes through [`decode_content`],
//! with [`detect_encoding`] picking the charset.

use serde_json::Value;

use crate::error::{CsvError, CsvResult};
use crate::models::{value_to_text, Field, Record};

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// A leading UTF-8 byte order mark is dropped so it never leaks into the
/// first header name.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => {
            let enc = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                CsvError::EncodingError(format!("unsupported encoding '{}'", other))
            })?;
            enc.decode(bytes).0.to_string()
        }
    };

    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

/// Decode bytes with auto-detected encoding.
///
/// Valid UTF-8 is taken as is. Charset detection only runs on byte streams
/// that are not UTF-8.
pub fn decode_bytes_auto(bytes: &[u8]) -> CsvResult<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string());
    }

    // Not UTF-8, whatever the detector says
    let encoding = match detect_encoding(bytes).as_str() {
        "utf-8" => "windows-1252".to_string(),
        other => other.to_string(),
    };
    decode_content(bytes, &encoding)
}

// =============================================================================
// Decode
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unquoted,
    Quoted,
}

/// Accumulates cells and rows while scanning.
#[derive(Default)]
struct RowBuilder {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

impl RowBuilder {
    fn end_cell(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        self.row.push(cell.trim().to_string());
    }

    /// Close the current row, skipping it when nothing was accumulated.
    fn end_row(&mut self) {
        if !self.cell.is_empty() || !self.row.is_empty() {
            self.end_cell();
            self.rows.push(std::mem::take(&mut self.row));
        }
    }

    fn finish(mut self) -> Vec<Vec<String>> {
        self.end_row();
        self.rows
    }
}

/// Split CSV text into rows of trimmed cells.
///
/// Blank lines are dropped. No header handling happens here.
pub fn decode_rows(text: &str) -> Vec<Vec<String>> {
    let mut builder = RowBuilder::default();
    let mut state = State::Unquoted;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Quoted => match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    builder.cell.push('"');
                }
                '"' => state = State::Unquoted,
                _ => builder.cell.push(c),
            },
            State::Unquoted => match c {
                '"' => state = State::Quoted,
                ',' => builder.end_cell(),
                '\n' | '\r' => builder.end_row(),
                _ => builder.cell.push(c),
            },
        }
    }

    builder.finish()
}

/// Decode CSV text into records.
///
/// The first row is the header; empty header names become `Column<n>`
/// (1-based). Short rows are padded with empty strings, long rows are cut to
/// the header width. Fewer than two rows yields no records.
pub fn decode(text: &str) -> Vec<Record> {
    let mut rows = decode_rows(text).into_iter();

    let header = match rows.next() {
        Some(header) => header_names(header),
        None => return Vec::new(),
    };

    rows.map(|row| {
        let mut record = Record::new();
        for (i, name) in header.iter().enumerate() {
            let value = row.get(i).cloned().unwrap_or_default();
            record.insert(name.clone(), Value::String(value));
        }
        record
    })
    .collect()
}

/// Replace empty header cells with synthetic `Column<n>` names.
pub fn header_names(header: Vec<String>) -> Vec<String> {
    header
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("Column{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect()
}

// =============================================================================
// Encode
// =============================================================================

/// Encode records as CSV.
///
/// One header line of field keys followed by one line per record, in field
/// order. Every cell is quoted and inner quotes are doubled. Lines are joined
/// with `\n` without a trailing newline.
pub fn encode(fields: &[Field], records: &[Record]) -> CsvResult<String> {
    if fields.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(fields.iter().map(|f| f.key.as_str()))?;

    for record in records {
        let row: Vec<String> = fields
            .iter()
            .map(|f| record.get(&f.key).map(value_to_text).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::WriteError(e.to_string()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| CsvError::WriteError(e.to_string()))?;

    if text.ends_with('\n') {
        text.pop();
    }

    Ok(text)
}
