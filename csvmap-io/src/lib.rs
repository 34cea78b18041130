//! csvmap I/O - Record reading and high-level APIs
//!
//! This crate connects mapping plans to delimited-text input:
//!
//! - The `RawReader` record source abstraction
//! - A CSV tokenizer tracking quoting, line numbers and raw bytes
//! - Reader contexts producing typed records one at a time, in bulk or by callback
//! - The `Mapper` facade

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod mapper;
pub mod raw;
pub mod reader;
pub mod tokenizer;

// Re-export commonly used types
pub use csvmap_codec::{Binding, MappingPlan, OverrideMapping};
pub use csvmap_format::{
    BoxError, CsvMapError, CsvRecord, MapperOptions, Result, UnmarshalCsv, UnmarshalQuotedCsv,
    UnmarshalText,
};

// Re-export our own types
pub use mapper::{Mapper, MapperConfig};
pub use raw::RawReader;
pub use reader::{ErrorHandler, ReaderContext};
pub use tokenizer::{CsvTokenizer, FieldCount, TokenizerOptions};
