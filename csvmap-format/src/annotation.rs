//! Field annotation syntax
//!
//! A field's annotation is the string given in `#[csv("...")]`. Recognized forms:
//!
//! - `[line]` - capture the line number the record started on
//! - `[raw]` - capture the record's fields
//! - `[rawData]` - capture the record's raw text
//! - `[N]` - bind to 1-based positional column N
//! - `-` (or an empty string) - skip the field
//! - any other string - bind to the column with that header
//! - no annotation - bind to the next implicit positional column

use crate::error::{CsvMapError, Result};

/// Annotation for the line-number capture
pub const TAG_LINE: &str = "[line]";
/// Annotation for the raw-record capture
pub const TAG_RAW: &str = "[raw]";
/// Annotation for the raw-line capture
pub const TAG_RAW_DATA: &str = "[rawData]";
/// Annotation that skips a field
pub const TAG_SKIP: &str = "-";

/// Parsed field annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// `[line]`
    Line,
    /// `[raw]`
    Raw,
    /// `[rawData]`
    RawData,
    /// `[N]`, 1-based
    Index(usize),
    /// Column header name
    Name(String),
    /// `-` or empty
    Skip,
    /// No annotation at all
    Implicit,
}

impl Annotation {
    /// Parse an optional annotation for the field identified by `field`
    pub fn parse(tag: Option<&str>, field: &str) -> Result<Self> {
        let Some(tag) = tag else {
            return Ok(Annotation::Implicit);
        };
        match tag {
            TAG_LINE => Ok(Annotation::Line),
            TAG_RAW => Ok(Annotation::Raw),
            TAG_RAW_DATA => Ok(Annotation::RawData),
            "" | TAG_SKIP => Ok(Annotation::Skip),
            _ => {
                if let Some(inner) = tag.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                    match inner.parse::<usize>() {
                        Ok(index) if index > 0 => Ok(Annotation::Index(index)),
                        _ => Err(CsvMapError::InvalidIndex {
                            index: inner.to_string(),
                            field: field.to_string(),
                        }),
                    }
                } else {
                    Ok(Annotation::Name(tag.to_string()))
                }
            }
        }
    }

    /// True for `[line]`, `[raw]` and `[rawData]`
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            Annotation::Line | Annotation::Raw | Annotation::RawData
        )
    }
}
