//! Comma-separated record parsing with a header row.
//!
//! Fields may be wrapped in double quotes, in which case commas are literal
//! and `""` is an escaped quote. Records never span a record delimiter, so
//! quoted fields cannot contain one. Blank records are skipped, a trailing
//! `\r` is dropped, missing fields become empty strings and surplus fields
//! are ignored.

use waypoint_types::record::Record;

const FIELD_SEPARATOR: char = ',';

/// Split one record into its raw fields.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == FIELD_SEPARATOR && !in_quotes => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

fn lines(content: &str, delimiter: char) -> impl Iterator<Item = &str> {
    content
        .split(delimiter)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
}

fn to_record(line: &str, schema: &[String]) -> Record {
    let mut values = split_fields(line).into_iter();
    schema
        .iter()
        .map(|name| (name.clone(), values.next().unwrap_or_default()))
        .collect()
}

/// Parse every record in `content` against `schema`.
pub fn parse_records(content: &str, delimiter: char, schema: &[String]) -> Vec<Record> {
    lines(content, delimiter)
        .map(|line| to_record(line, schema))
        .collect()
}

/// Parse `content` whose first record is the header.
///
/// Returns the header as schema plus the records after it. Empty content
/// yields an empty schema.
pub fn parse_with_header(content: &str, delimiter: char) -> (Vec<String>, Vec<Record>) {
    let mut lines = lines(content, delimiter);
    let Some(header) = lines.next() else {
        return (Vec::new(), Vec::new());
    };
    let schema = split_fields(header);
    let records = lines.map(|line| to_record(line, &schema)).collect();
    (schema, records)
}
