//! csvmap codec - Mapping plan engine
//!
//! This crate turns record type descriptions into mapping plans:
//!
//! - Plan construction from field descriptors (positional, named and special bindings)
//! - Copy-on-write plan adaptation through override mappings
//! - Effective mapping queries

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod overrides;
pub mod plan;

// Re-export commonly used types
pub use csvmap_format::{CsvMapError, CsvRecord, MapperOptions, Result};

// Re-export our own types
pub use overrides::OverrideMapping;
pub use plan::{Binding, BoundField, FieldId, MappingPlan, SpecialBindings};
