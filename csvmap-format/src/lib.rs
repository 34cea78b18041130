//! csvmap format - Core primitives for mapping CSV records onto structs
//!
//! This crate holds everything needed to describe a record type, with no I/O
//! dependencies. It includes:
//!
//! - Error types
//! - Field annotation syntax
//! - Built-in value parsing
//! - Custom unmarshal capabilities
//! - Field descriptors and the `CsvRecord` derive
//! - Setter construction
//! - Mapper options

#![deny(unsafe_code)]
#![warn(missing_docs)]

// `#[derive(CsvRecord)]` expands to `::csvmap_format` paths, used by this crate's unit tests.
extern crate self as csvmap_format;

pub mod annotation;
pub mod capability;
pub mod descriptor;
pub mod error;
pub mod options;
pub mod setter;
pub mod value;

// Re-export commonly used types
pub use annotation::Annotation;
pub use capability::{Capability, FieldType, UnmarshalCsv, UnmarshalQuotedCsv, UnmarshalText};
pub use csvmap_derive::CsvRecord;
pub use descriptor::{Binder, CsvRecord, FieldDescriptor, FieldKind};
pub use error::{BoxError, CsvMapError, Result};
pub use options::MapperOptions;
pub use setter::SetterInput;
pub use value::{BuiltinValue, ValueKind};
