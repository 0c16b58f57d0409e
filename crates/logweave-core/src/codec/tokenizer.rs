//! Quote-aware CSV scanner.
//!
//! One state machine serves both granularities: splitting file contents into
//! records and splitting a record into fields. Inside quotes, `""` is an escaped
//! quote; any other `"` toggles the quote state. Outside quotes the field
//! delimiter separates fields and a bare `\n` or `\r\n` separates records.

/// What the scanner splits on.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    /// Physical line breaks outside quotes. Quotes are kept verbatim.
    Record,
    /// The delimiter outside quotes. Quotes are consumed.
    Field(char),
}

/// Split raw file contents into records, dropping blank ones.
pub fn split_records(content: &str) -> Vec<String> {
    scan(content, Boundary::Record)
        .into_iter()
        .filter(|record| !record.trim_matches([' ', '\t']).is_empty())
        .collect()
}

/// Split one record into unquoted field values.
pub fn split_fields(record: &str, delimiter: char) -> Vec<String> {
    scan(record, Boundary::Field(delimiter))
}

fn scan(input: &str, boundary: Boundary) -> Vec<String> {
    let keep_quotes = matches!(boundary, Boundary::Record);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut inside_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '"' {
            if inside_quotes && chars.peek() == Some(&'"') {
                chars.next();
                current.push_str(if keep_quotes { "\"\"" } else { "\"" });
            } else {
                inside_quotes = !inside_quotes;
                if keep_quotes {
                    current.push('"');
                }
            }
            continue;
        }

        if !inside_quotes {
            match boundary {
                Boundary::Field(delimiter) if ch == delimiter => {
                    pieces.push(std::mem::take(&mut current));
                    continue;
                }
                Boundary::Record if ch == '\n' || ch == '\r' => {
                    if ch == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    if !current.is_empty() {
                        pieces.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                _ => {}
            }
        }

        current.push(ch);
    }

    match boundary {
        Boundary::Field(_) => pieces.push(current),
        Boundary::Record if !current.is_empty() => pieces.push(current),
        Boundary::Record => {}
    }

    pieces
}
