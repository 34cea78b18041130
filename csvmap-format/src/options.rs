//! Mapper-wide options

use serde::{Deserialize, Serialize};

/// Options controlling how records are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Named fields whose header is missing (or whose column is absent from a
    /// record) are left at their default instead of failing the read
    pub ignore_unknown_field_names: bool,
    /// Empty text for numeric and boolean fields parses as the zero value
    pub default_empty_values: bool,
}

impl MapperOptions {
    /// Set `ignore_unknown_field_names`
    pub fn with_ignore_unknown_field_names(mut self, ignore: bool) -> Self {
        self.ignore_unknown_field_names = ignore;
        self
    }

    /// Set `default_empty_values`
    pub fn with_default_empty_values(mut self, default_empty: bool) -> Self {
        self.default_empty_values = default_empty;
        self
    }
}
