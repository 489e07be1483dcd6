//! Minimal quote-aware CSV reading and writing.
//!
//! Handles quoted fields with embedded commas, doubled-quote escapes and
//! newlines inside quotes, which is all the manifest and report files need.

/// Parse CSV content into records of fields.
///
/// A trailing newline does not produce an empty record.
pub fn parse_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = true;
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut records, &mut record, &mut field, &mut field_started);
            }
            '\n' => end_record(&mut records, &mut record, &mut field, &mut field_started),
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }
    if field_started || !record.is_empty() || !field.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}

fn end_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    field_started: &mut bool,
) {
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
    *field_started = false;
}

/// Append one CSV row to `out`, quoting fields only when required.
pub fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let f = f.as_ref();
        if f.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&f.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(f);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_records() {
        let records = parse_records("a,b,c\nd,e,f\n");
        assert_eq!(records, vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn parses_quoted_fields() {
        let records = parse_records("a,\"b, with comma\",\"he said \"\"hi\"\"\"\n");
        assert_eq!(
            records,
            vec![vec!["a", "b, with comma", "he said \"hi\""]]
        );
    }

    #[test]
    fn parses_newline_inside_quotes() {
        let records = parse_records("a,\"line one\nline two\"\n");
        assert_eq!(records, vec![vec!["a", "line one\nline two"]]);
    }

    #[test]
    fn handles_crlf_and_missing_trailing_newline() {
        let records = parse_records("a,b\r\nc,d");
        assert_eq!(records, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn write_row_quotes_only_when_needed() {
        let mut out = String::new();
        write_row(&mut out, &["plain", "a,b", "q\"uote"]);
        assert_eq!(out, "plain,\"a,b\",\"q\"\"uote\"\n");
    }

    #[test]
    fn write_then_parse_round_trips() {
        let mut out = String::new();
        write_row(&mut out, &["x", "y,z", ""]);
        assert_eq!(parse_records(&out), vec![vec!["x", "y,z", ""]]);
    }
}
