//! Error types for csvmap

use thiserror::Error;

/// Boxed error returned by user hooks (custom unmarshalers, post processors, callbacks)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// csvmap error types
#[derive(Debug, Error)]
pub enum CsvMapError {
    /// A special tag was placed on a field of the wrong type.
    #[error("field with {tag:?} expected to be {expected} (field name: {field:?})")]
    SpecialFieldType {
        /// The special tag (`[line]`, `[raw]` or `[rawData]`)
        tag: &'static str,
        /// Description of the accepted field types
        expected: &'static str,
        /// Identity of the offending field
        field: String,
    },
    /// A special tag was claimed by more than one field.
    #[error("field with {tag:?} already mapped (field name: {field:?}, mapped by: {existing:?})")]
    DuplicateSpecial {
        /// The special tag
        tag: &'static str,
        /// Identity of the second field claiming the tag
        field: String,
        /// Identity of the field that claimed the tag first
        existing: String,
    },
    /// `[N]` annotation with a non-numeric or non-positive index.
    #[error("invalid csv field index [{index}] (field name: {field:?})")]
    InvalidIndex {
        /// Text found between the brackets
        index: String,
        /// Identity of the offending field
        field: String,
    },
    /// Two fields bound to the same positional column.
    #[error("field with csv index {index} already mapped (field name: {field:?}, mapped by: {existing:?})")]
    DuplicateIndex {
        /// 1-based column index
        index: usize,
        /// Identity of the field that failed to bind
        field: String,
        /// Identity of the field already holding the index
        existing: String,
    },
    /// Two fields bound to the same column header.
    #[error("field with csv name {name:?} already mapped (field name: {field:?}, mapped by: {existing:?})")]
    DuplicateName {
        /// Column header name
        name: String,
        /// Identity of the field that failed to bind
        field: String,
        /// Identity of the field already holding the name
        existing: String,
    },
    /// Two leaf fields resolved to the same identity.
    #[error("duplicate field name {0:?}")]
    DuplicateField(String),
    /// A nested record field carried a positional or named annotation.
    #[error("nested struct field cannot have csv tag (field name: {0:?})")]
    NestedAnnotated(String),
    /// The field's type cannot be bound to a column.
    #[error("struct field unsupported type: {0}")]
    UnsupportedType(String),
    /// An override addressed a field identity that does not exist.
    #[error("field {0:?} not found")]
    FieldNotFound(String),
    /// Raw text could not be converted to the field's type.
    #[error("cannot convert value {value:?} to {target}")]
    Parse {
        /// The raw text value
        value: String,
        /// Name of the target type
        target: &'static str,
    },
    /// Named bindings exist but the source declares no header row.
    #[error("csv headers not present")]
    HeadersNotPresent,
    /// A named binding references a header the source does not have.
    #[error("csv header {0:?} not present")]
    HeaderNotPresent(String),
    /// A header resolved to a column the current record does not have.
    #[error("csv field index {index} out of range in record (record length: {len})")]
    FieldOutOfRange {
        /// 1-based column index the header resolved to
        index: usize,
        /// Number of fields in the record
        len: usize,
    },
    /// The tokenizer could not split the input into a record.
    #[error("parse error on line {line}, column {column}: {message}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// 1-based column (character) position
        column: usize,
        /// What was wrong
        message: String,
    },
    /// The record does not have the expected number of fields.
    #[error("record on line {line}: wrong number of fields (expected {expected}, got {actual})")]
    FieldCount {
        /// 1-based line number the record started on
        line: usize,
        /// Expected field count
        expected: usize,
        /// Actual field count
        actual: usize,
    },
    /// Tokenizer configured with an unusable field or comment delimiter.
    #[error("invalid field or comment delimiter {0:?}")]
    InvalidDelimiter(char),
    /// I/O operation failed while reading input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Error produced by user code (unmarshal hook, post processor, iteration callback).
    #[error(transparent)]
    Custom(BoxError),
    /// An error annotated with the line it occurred on.
    #[error("line {line}: {source}")]
    AtLine {
        /// 1-based line number
        line: usize,
        /// The underlying error
        #[source]
        source: Box<CsvMapError>,
    },
}

impl CsvMapError {
    /// Wrap an arbitrary user error
    pub fn custom(err: impl Into<BoxError>) -> Self {
        CsvMapError::Custom(err.into())
    }

    /// Annotate this error with a line number
    pub fn at_line(self, line: usize) -> Self {
        CsvMapError::AtLine {
            line,
            source: Box::new(self),
        }
    }

    /// Strip any line annotation, returning the originating error
    pub fn root(&self) -> &CsvMapError {
        match self {
            CsvMapError::AtLine { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CsvMapError>;
