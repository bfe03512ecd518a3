//! Minimal delimited-text reading and writing.

use std::borrow::Cow;
use std::io::{self, Write};

use sluice_core::Datum;

/// Writes a table as delimited text, one record per line.
pub(super) fn write_records<'a, W, I>(
    mut writer: W,
    columns: &[String],
    rows: I,
    delimiter: char,
    header: bool,
) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Vec<Datum>>,
{
    if header {
        write_line(&mut writer, columns.iter().map(|column| escape(column, delimiter)), delimiter)?;
    }
    for row in rows {
        write_line(
            &mut writer,
            row.iter()
                .map(|cell| Cow::Owned(escape(&render_cell(cell), delimiter).into_owned())),
            delimiter,
        )?;
    }
    writer.flush()
}

fn write_line<'a, W: Write>(
    writer: &mut W,
    fields: impl Iterator<Item = Cow<'a, str>>,
    delimiter: char,
) -> io::Result<()> {
    let mut separator = [0; 4];
    let separator = delimiter.encode_utf8(&mut separator);
    for (index, field) in fields.enumerate() {
        if index > 0 {
            writer.write_all(separator.as_bytes())?;
        }
        writer.write_all(field.as_bytes())?;
    }
    writer.write_all(b"\n")
}

/// Renders a cell; floats keep a decimal point so they read back as floats.
fn render_cell(cell: &Datum) -> String {
    match cell {
        Datum::Float(value) if value.is_nan() => String::new(),
        Datum::Float(value) => format!("{value:?}"),
        other => other.to_string(),
    }
}

fn escape(field: &str, delimiter: char) -> Cow<'_, str> {
    let needs_quotes = field
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\n' || c == '\r');
    if needs_quotes {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Splits delimited text into records of raw fields.
///
/// Quoted fields may contain delimiters, doubled quotes and line breaks.
/// Blank lines are skipped.
pub(super) fn read_records(text: &str, delimiter: char) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                finish_record(&mut records, &mut record, &mut field);
            }
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".into());
    }
    finish_record(&mut records, &mut record, &mut field);
    Ok(records)
}

fn finish_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    record.push(std::mem::take(field));
    let record = std::mem::take(record);
    if !(record.len() == 1 && record[0].is_empty()) {
        records.push(record);
    }
}

/// Types a raw field: empty is null, then integer, float, boolean, text.
pub(super) fn parse_cell(raw: &str) -> Datum {
    if raw.is_empty() {
        return Datum::Null;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Datum::Int(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return Datum::Float(value);
    }
    match raw {
        "true" | "True" | "TRUE" => Datum::Bool(true),
        "false" | "False" | "FALSE" => Datum::Bool(false),
        _ => Datum::Text(raw.to_owned()),
    }
}
