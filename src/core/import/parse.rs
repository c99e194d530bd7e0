use csv::{ReaderBuilder, StringRecord};

use crate::error::{Error, ParseDiagnostic, MAX_PARSE_DIAGNOSTICS};

const QUOTE: u8 = b'"';
const DELIMITER: u8 = b',';

/// Problems found while reading, capped at [`MAX_PARSE_DIAGNOSTICS`].
#[derive(Debug, Default)]
struct Diagnostics {
    list: Vec<ParseDiagnostic>,
    total: usize,
}

impl Diagnostics {
    fn push(&mut self, row: Option<u64>, message: impl Into<String>) {
        self.total += 1;
        if self.list.len() < MAX_PARSE_DIAGNOSTICS {
            self.list.push(ParseDiagnostic {
                row,
                message: message.into(),
            });
        }
    }

    fn into_result<T>(self, value: T) -> Result<T, Error> {
        if self.total == 0 {
            return Ok(value);
        }

        log::warn!("Rejecting CSV with {} invalid records", self.total);
        Err(Error::Parse {
            diagnostics: self.list,
            total: self.total,
        })
    }
}

/// Line on which a quoted field opens without ever closing.
///
/// A quote only opens a field when it is the first byte of that field, and a
/// doubled quote inside a quoted field is an escaped quote. The csv reader
/// accepts such input silently and swallows everything after the quote.
fn unterminated_quote(bytes: &[u8]) -> Option<u64> {
    let mut line = 1;
    let mut opened_at = None;
    let mut field_start = true;

    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        match opened_at {
            Some(_) if byte == QUOTE => {
                if bytes.get(i + 1) == Some(&QUOTE) {
                    i += 1;
                } else {
                    opened_at = None;
                    field_start = false;
                }
            }
            Some(_) => {}
            None => match byte {
                QUOTE if field_start => opened_at = Some(line),
                DELIMITER | b'\n' | b'\r' => field_start = true,
                _ => field_start = false,
            },
        }

        if byte == b'\n' {
            line += 1;
        }
        i += 1;
    }

    opened_at
}

/// Read every record of the export, dropping the header row.
///
/// Records may have any number of fields and blank lines are skipped. Bytes
/// that are not valid UTF-8 are replaced, not rejected. If any record is
/// structurally invalid the whole file is rejected.
pub fn read_records(bytes: &[u8]) -> Result<Vec<StringRecord>, Error> {
    let mut diagnostics = Diagnostics::default();
    if let Some(line) = unterminated_quote(bytes) {
        diagnostics.push(Some(line), "Quoted field unterminated");
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = Vec::new();
    for result in reader.byte_records() {
        match result {
            Ok(record) => records.push(StringRecord::from_byte_record_lossy(record)),
            Err(err) => diagnostics.push(err.position().map(|pos| pos.line()), err.to_string()),
        }
    }

    let mut records = diagnostics.into_result(records)?;
    if !records.is_empty() {
        records.remove(0);
    }
    Ok(records)
}
