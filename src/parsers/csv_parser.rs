//! Delimited-text primitives
//!
//! Contact lists use `;` as delimiter. Documents are split on `\n` and each
//! line is split on its own, so a stray quote never spills into the next row.
//! A field wrapped in double quotes (with `""` escapes) is unquoted; any other
//! quote is kept as written. Writing goes through the `csv` crate.

use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Delimiter of contact lists
pub const CONTACT_DELIMITER: u8 = b';';

/// A non-blank line of a delimited document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLine {
    /// 1-based line number in the source text
    pub line: usize,
    /// Trimmed fields
    pub fields: Vec<String>,
}

/// Read every non-blank line of `text`.
///
/// Lines that are empty or whitespace-only are dropped; line numbers still
/// count them.
pub fn read_lines(text: &str, delimiter: u8) -> Vec<CsvLine> {
    text.split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| CsvLine {
            line: index + 1,
            fields: split_fields(line, delimiter),
        })
        .collect()
}

/// Split a single line into trimmed fields.
///
/// When the quoting of the line is malformed the line is split on the
/// delimiter as is.
pub fn split_fields(line: &str, delimiter: u8) -> Vec<String> {
    let delimiter = char::from(delimiter);
    if line.contains('"') {
        if let Some(fields) = split_quoted(line, delimiter) {
            return fields;
        }
    }
    line.split(delimiter).map(|f| f.trim().to_string()).collect()
}

fn split_quoted(line: &str, delimiter: char) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        let Some(inner) = rest.trim_start().strip_prefix('"') else {
            match rest.find(delimiter) {
                Some(end) => {
                    fields.push(rest[..end].trim().to_string());
                    rest = &rest[end + delimiter.len_utf8()..];
                    continue;
                }
                None => {
                    fields.push(rest.trim().to_string());
                    return Some(fields);
                }
            }
        };

        let (value, after) = unquote(inner)?;
        fields.push(value);

        let after = after.trim_start();
        if after.is_empty() {
            return Some(fields);
        }
        rest = after.strip_prefix(delimiter)?;
    }
}

/// Read a quoted value up to its closing quote, returning the value and
/// the text after the quote. `None` when the quote is never closed.
fn unquote(inner: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = inner.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c != '"' {
            value.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            value.push('"');
            chars.next();
            continue;
        }
        return Some((value, &inner[index + 1..]));
    }

    None
}

/// Write rows as delimited text, `\n`-joined without a trailing newline.
///
/// Fields containing the delimiter, a double quote, CR or LF are quoted with
/// inner quotes doubled.
pub fn write_rows<I, R>(rows: I, delimiter: u8) -> csv::Result<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    let mut buffer = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    if buffer.last() == Some(&b'\n') {
        buffer.pop();
    }
    Ok(buffer)
}
