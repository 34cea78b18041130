//! Delimited-text tokenizer
//!
//! Splits RFC 4180 style input into records while keeping what the mapping
//! layer needs beyond the field values: the line each record started on,
//! which fields were quoted, and the exact bytes of the record.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use csvmap_format::{CsvMapError, Result};

use crate::raw::RawReader;

const QUOTE: char = '"';

const ERR_BARE_QUOTE: &str = "bare \" in non-quoted field";
const ERR_QUOTE: &str = "extraneous or missing \" in quoted field";

/// Field count enforcement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCount {
    /// Every record must have as many fields as the first one (header included)
    #[default]
    FirstRecord,
    /// Every record must have exactly this many fields
    Exactly(usize),
    /// Records may vary in length
    Any,
}

/// Tokenizer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerOptions {
    /// Field delimiter
    pub delimiter: char,
    /// Lines starting with this character are skipped
    pub comment: Option<char>,
    /// Field count enforcement
    pub fields_per_record: FieldCount,
    /// Tolerate quotes in unquoted fields and stray quotes in quoted fields
    pub lazy_quotes: bool,
    /// Ignore leading white space in each field
    pub trim_leading_space: bool,
    /// The first record is data, not a header
    pub no_header: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            comment: None,
            fields_per_record: FieldCount::FirstRecord,
            lazy_quotes: false,
            trim_leading_space: false,
            no_header: false,
        }
    }
}

impl TokenizerOptions {
    /// Check the delimiter and comment characters
    pub fn validate(&self) -> Result<()> {
        if !valid_delimiter(self.delimiter) {
            return Err(CsvMapError::InvalidDelimiter(self.delimiter));
        }
        if let Some(comment) = self.comment {
            if !valid_delimiter(comment) || comment == self.delimiter {
                return Err(CsvMapError::InvalidDelimiter(comment));
            }
        }
        Ok(())
    }
}

fn valid_delimiter(c: char) -> bool {
    !matches!(c, QUOTE | '\r' | '\n' | char::REPLACEMENT_CHARACTER)
}

/// [`RawReader`] over any buffered byte source
pub struct CsvTokenizer<B> {
    input: B,
    options: TokenizerOptions,
    header: Option<Vec<String>>,
    header_read: bool,
    expected_fields: Option<usize>,
    lines: usize,
    record_line: usize,
    quoted: Vec<bool>,
    raw: Vec<u8>,
    exhausted: bool,
}

impl<B: BufRead> CsvTokenizer<B> {
    /// Create a tokenizer; the header row (if any) is consumed by the first read.
    ///
    /// Fails if the delimiter or comment character is a quote, a line break or
    /// U+FFFD, or if both are the same character.
    pub fn new(input: B, options: TokenizerOptions) -> Result<Self> {
        options.validate()?;
        let expected_fields = match options.fields_per_record {
            FieldCount::Exactly(count) => Some(count),
            FieldCount::FirstRecord | FieldCount::Any => None,
        };
        Ok(Self {
            input,
            options,
            header: None,
            header_read: options.no_header,
            expected_fields,
            lines: 0,
            record_line: 0,
            quoted: Vec::new(),
            raw: Vec::new(),
            exhausted: false,
        })
    }

    /// Options the tokenizer was created with
    pub fn options(&self) -> &TokenizerOptions {
        &self.options
    }

    /// Recover the underlying source
    pub fn into_inner(self) -> B {
        self.input
    }

    /// Next physical line with `\r\n` normalized to `\n`, appending its bytes to the raw buffer
    fn next_line(&mut self) -> Result<Option<String>> {
        let start = self.raw.len();
        let read = self.input.read_until(b'\n', &mut self.raw)?;
        if read == 0 {
            return Ok(None);
        }
        self.lines += 1;
        let mut line = String::from_utf8_lossy(&self.raw[start..]).into_owned();
        if line.ends_with("\r\n") {
            line.truncate(line.len() - 2);
            line.push('\n');
        }
        Ok(Some(line))
    }

    fn is_skipped(&self, line: &str) -> bool {
        if line == "\n" || line.is_empty() {
            return true;
        }
        matches!(self.options.comment, Some(comment) if line.starts_with(comment))
    }

    /// Parse one record, skipping blank and comment lines
    fn parse_record(&mut self) -> Result<Option<Vec<String>>> {
        self.quoted.clear();
        let first = loop {
            self.raw.clear();
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if self.is_skipped(&line) => continue,
                Some(line) => break line,
            }
        };
        self.record_line = self.lines;
        let fields = self.parse_fields(first)?;
        self.check_field_count(fields.len())?;
        Ok(Some(fields))
    }

    fn parse_fields(&mut self, first: String) -> Result<Vec<String>> {
        let delimiter = self.options.delimiter;
        let mut line = first;
        let mut pos = 0;
        let mut fields = Vec::new();

        loop {
            if self.options.trim_leading_space {
                let rest = &line[pos..];
                let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() && c != '\n');
                pos += rest.len() - trimmed.len();
            }

            if !line[pos..].starts_with(QUOTE) {
                let rest = &line[pos..];
                let (field, next) = match rest.find(delimiter) {
                    Some(i) => (&rest[..i], Some(pos + i + delimiter.len_utf8())),
                    None => (rest.strip_suffix('\n').unwrap_or(rest), None),
                };
                if !self.options.lazy_quotes {
                    if let Some(i) = field.find(QUOTE) {
                        return Err(self.malformed(&line, pos + i, ERR_BARE_QUOTE));
                    }
                }
                fields.push(field.to_string());
                self.quoted.push(false);
                match next {
                    Some(next) => {
                        pos = next;
                        continue;
                    }
                    None => return Ok(fields),
                }
            }

            // Quoted field
            pos += QUOTE.len_utf8();
            let mut value = String::new();
            loop {
                let rest = &line[pos..];
                if let Some(i) = rest.find(QUOTE) {
                    value.push_str(&rest[..i]);
                    pos += i + QUOTE.len_utf8();
                    let after = &line[pos..];
                    match after.chars().next() {
                        Some(QUOTE) => {
                            value.push(QUOTE);
                            pos += QUOTE.len_utf8();
                        }
                        Some(c) if c == delimiter => {
                            pos += c.len_utf8();
                            fields.push(value);
                            self.quoted.push(true);
                            break;
                        }
                        None | Some('\n') => {
                            fields.push(value);
                            self.quoted.push(true);
                            return Ok(fields);
                        }
                        Some(_) if self.options.lazy_quotes => value.push(QUOTE),
                        Some(_) => {
                            return Err(self.malformed(&line, pos - QUOTE.len_utf8(), ERR_QUOTE));
                        }
                    }
                } else if !rest.is_empty() {
                    // Field continues on the next line
                    value.push_str(rest);
                    match self.next_line()? {
                        Some(next) => {
                            line = next;
                            pos = 0;
                        }
                        None if self.options.lazy_quotes => {
                            fields.push(value);
                            self.quoted.push(true);
                            return Ok(fields);
                        }
                        None => return Err(self.malformed(&line, line.len(), ERR_QUOTE)),
                    }
                } else if self.options.lazy_quotes {
                    fields.push(value);
                    self.quoted.push(true);
                    return Ok(fields);
                } else {
                    return Err(self.malformed(&line, pos, ERR_QUOTE));
                }
            }
        }
    }

    fn malformed(&self, line: &str, byte_pos: usize, message: &str) -> CsvMapError {
        let column = line[..byte_pos.min(line.len())].chars().count() + 1;
        tracing::trace!(line = self.lines, column, reason = message, "malformed record");
        CsvMapError::Malformed {
            line: self.lines,
            column,
            message: message.to_string(),
        }
    }

    fn check_field_count(&mut self, actual: usize) -> Result<()> {
        match (self.options.fields_per_record, self.expected_fields) {
            (FieldCount::Any, _) => Ok(()),
            (_, Some(expected)) if expected != actual => Err(CsvMapError::FieldCount {
                line: self.record_line,
                expected,
                actual,
            }),
            (_, Some(_)) => Ok(()),
            (_, None) => {
                self.expected_fields = Some(actual);
                Ok(())
            }
        }
    }
}

impl<B: BufRead> RawReader for CsvTokenizer<B> {
    fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        if self.exhausted {
            return Ok(None);
        }
        if !self.header_read {
            // A malformed header row is retried with the following line on the next read
            let header = self.parse_record()?;
            self.header_read = true;
            match header {
                Some(header) => {
                    tracing::trace!(line = self.record_line, columns = header.len(), "read header row");
                    self.header = Some(header);
                }
                None => {
                    self.exhausted = true;
                    return Ok(None);
                }
            }
        }
        let record = self.parse_record()?;
        if record.is_none() {
            self.exhausted = true;
            self.raw.clear();
            self.quoted.clear();
        }
        Ok(record)
    }

    fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    fn line(&self) -> usize {
        self.record_line
    }

    fn field_quoted(&self, index: usize) -> bool {
        self.quoted.get(index).copied().unwrap_or(false)
    }

    fn raw_record(&self) -> &[u8] {
        &self.raw
    }
}
