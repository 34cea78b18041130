//! Custom unmarshal capabilities and per-type parsing strategies
//!
//! A field type resolves to exactly one [`Capability`], picked in this order:
//!
//! 1. [`UnmarshalCsv`] - parse from the raw value and the full record
//! 2. [`UnmarshalQuotedCsv`] - as above, plus whether the value was quoted
//! 3. [`UnmarshalText`] - parse from the raw value alone
//! 4. a nested record ([`CsvRecord`]) - its fields are visited instead
//! 5. a [`BuiltinValue`] primitive
//! 6. anything else is unsupported
//!
//! The choice is made once, when the record type's descriptors are created, and
//! stored in a [`FieldType`]. Derived descriptors resolve it at compile time via
//! the [`probe`] module.

use crate::descriptor::{CsvRecord, FieldDescriptor};
use crate::error::{BoxError, Result};
use crate::value::{BuiltinValue, ValueKind};

/// Parse a value from its raw text and the full record it belongs to.
///
/// Takes priority over the other unmarshal capabilities.
pub trait UnmarshalCsv: Sized {
    /// Build the value from `value`; `record` holds every field of the current record
    fn unmarshal_csv(value: &str, record: &[String]) -> std::result::Result<Self, BoxError>;
}

/// Parse a value from its raw text, its quoting and the full record it belongs to.
pub trait UnmarshalQuotedCsv: Sized {
    /// Build the value from `value`; `quoted` tells whether the source field was quoted
    fn unmarshal_quoted_csv(
        value: &str,
        quoted: bool,
        record: &[String],
    ) -> std::result::Result<Self, BoxError>;
}

/// Parse a value from its raw text only.
pub trait UnmarshalText: Sized {
    /// Build the value from `text`
    fn unmarshal_text(text: &str) -> std::result::Result<Self, BoxError>;
}

/// `UnmarshalCsv` hook
pub type RecordHook<T> = fn(&str, &[String]) -> std::result::Result<T, BoxError>;
/// `UnmarshalQuotedCsv` hook
pub type QuotedHook<T> = fn(&str, bool, &[String]) -> std::result::Result<T, BoxError>;
/// `UnmarshalText` hook
pub type TextHook<T> = fn(&str) -> std::result::Result<T, BoxError>;
/// Built-in parser
pub type BuiltinParser<T> = fn(&str, bool) -> Result<T>;

/// How values of a type are produced from raw column text
pub enum Capability<T> {
    /// [`UnmarshalCsv`]
    Record(RecordHook<T>),
    /// [`UnmarshalQuotedCsv`]
    Quoted(QuotedHook<T>),
    /// [`UnmarshalText`]
    Text(TextHook<T>),
    /// A nested record; holds its field descriptors
    Nested(fn() -> Vec<FieldDescriptor<T>>),
    /// A [`BuiltinValue`]
    Builtin {
        /// Value shape
        kind: ValueKind,
        /// Parser
        parse: BuiltinParser<T>,
    },
    /// No way to bind the type to a column
    Unsupported,
}

impl<T> Clone for Capability<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Capability<T> {}

impl<T> Capability<T> {
    /// True for the three custom unmarshal hooks
    pub fn is_custom(&self) -> bool {
        matches!(
            self,
            Capability::Record(_) | Capability::Quoted(_) | Capability::Text(_)
        )
    }
}

/// Conversions used by the special `[line]`, `[raw]` and `[rawData]` bindings
pub struct Captures<T> {
    /// Line number capture
    pub line: Option<fn(usize) -> T>,
    /// Raw record capture
    pub record: Option<fn(&[String]) -> T>,
    /// Raw line capture
    pub raw_line: Option<fn(&[u8]) -> T>,
}

impl<T> Captures<T> {
    /// No captures supported
    pub fn none() -> Self {
        Captures {
            line: None,
            record: None,
            raw_line: None,
        }
    }
}

impl<T> Clone for Captures<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Captures<T> {}

/// Everything known about a field's declared type
pub struct FieldType<T> {
    /// Type name for error messages
    pub type_name: &'static str,
    /// Column parsing strategy
    pub capability: Capability<T>,
    /// Special binding conversions
    pub captures: Captures<T>,
}

impl<T> Clone for FieldType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldType<T> {}

impl<T> std::fmt::Debug for FieldType<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let capability = match self.capability {
            Capability::Record(_) => "record",
            Capability::Quoted(_) => "quoted",
            Capability::Text(_) => "text",
            Capability::Nested(_) => "nested",
            Capability::Builtin { .. } => "builtin",
            Capability::Unsupported => "unsupported",
        };
        f.debug_struct("FieldType")
            .field("type_name", &self.type_name)
            .field("capability", &capability)
            .finish()
    }
}

impl<T: UnmarshalCsv> FieldType<T> {
    /// Field type driven by [`UnmarshalCsv`]
    pub fn unmarshal_csv() -> Self {
        Self::custom(Capability::Record(T::unmarshal_csv))
    }
}

impl<T: UnmarshalQuotedCsv> FieldType<T> {
    /// Field type driven by [`UnmarshalQuotedCsv`]
    pub fn unmarshal_quoted_csv() -> Self {
        Self::custom(Capability::Quoted(T::unmarshal_quoted_csv))
    }
}

impl<T: UnmarshalText> FieldType<T> {
    /// Field type driven by [`UnmarshalText`]
    pub fn unmarshal_text() -> Self {
        Self::custom(Capability::Text(T::unmarshal_text))
    }
}

impl<T: CsvRecord> FieldType<T> {
    /// Field type of a nested record
    pub fn nested() -> Self {
        FieldType {
            type_name: std::any::type_name::<T>(),
            capability: Capability::Nested(T::fields),
            captures: Captures::none(),
        }
    }
}

impl<T: BuiltinValue> FieldType<T> {
    /// Field type of a built-in primitive
    pub fn builtin() -> Self {
        FieldType {
            type_name: T::TYPE_NAME,
            capability: Capability::Builtin {
                kind: T::KIND,
                parse: T::parse_value,
            },
            captures: T::captures(),
        }
    }
}

impl<T> FieldType<T> {
    /// Field type that cannot be bound
    pub fn unsupported() -> Self {
        FieldType {
            type_name: std::any::type_name::<T>(),
            capability: Capability::Unsupported,
            captures: Captures::none(),
        }
    }

    fn custom(capability: Capability<T>) -> Self {
        FieldType {
            type_name: std::any::type_name::<T>(),
            capability,
            captures: Captures::none(),
        }
    }
}

/// Compile-time capability resolution for derived descriptors.
///
/// Each level is a trait implemented for a different number of references to
/// [`Probe`]; method lookup on `(&&&&&&Probe::<T>::new()).field_type()` picks
/// the most-referenced level whose bound `T` satisfies. Only meaningful for
/// concrete types.
pub mod probe {
    use super::*;
    use std::marker::PhantomData;

    /// Zero-sized carrier for a field type
    pub struct Probe<T>(PhantomData<T>);

    impl<T> Probe<T> {
        /// New probe
        pub fn new() -> Self {
            Probe(PhantomData)
        }
    }

    impl<T> Default for Probe<T> {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Level 6: [`UnmarshalCsv`]
    pub trait ViaUnmarshalCsv {
        /// Probed type
        type Value;
        /// Resolved field type
        fn field_type(&self) -> FieldType<Self::Value>;
    }

    impl<T: UnmarshalCsv> ViaUnmarshalCsv for &&&&&Probe<T> {
        type Value = T;
        fn field_type(&self) -> FieldType<T> {
            FieldType::unmarshal_csv()
        }
    }

    /// Level 5: [`UnmarshalQuotedCsv`]
    pub trait ViaUnmarshalQuotedCsv {
        /// Probed type
        type Value;
        /// Resolved field type
        fn field_type(&self) -> FieldType<Self::Value>;
    }

    impl<T: UnmarshalQuotedCsv> ViaUnmarshalQuotedCsv for &&&&Probe<T> {
        type Value = T;
        fn field_type(&self) -> FieldType<T> {
            FieldType::unmarshal_quoted_csv()
        }
    }

    /// Level 4: [`UnmarshalText`]
    pub trait ViaUnmarshalText {
        /// Probed type
        type Value;
        /// Resolved field type
        fn field_type(&self) -> FieldType<Self::Value>;
    }

    impl<T: UnmarshalText> ViaUnmarshalText for &&&Probe<T> {
        type Value = T;
        fn field_type(&self) -> FieldType<T> {
            FieldType::unmarshal_text()
        }
    }

    /// Level 3: nested [`CsvRecord`]
    pub trait ViaNestedRecord {
        /// Probed type
        type Value;
        /// Resolved field type
        fn field_type(&self) -> FieldType<Self::Value>;
    }

    impl<T: CsvRecord> ViaNestedRecord for &&Probe<T> {
        type Value = T;
        fn field_type(&self) -> FieldType<T> {
            FieldType::nested()
        }
    }

    /// Level 2: [`BuiltinValue`]
    pub trait ViaBuiltin {
        /// Probed type
        type Value;
        /// Resolved field type
        fn field_type(&self) -> FieldType<Self::Value>;
    }

    impl<T: BuiltinValue> ViaBuiltin for &Probe<T> {
        type Value = T;
        fn field_type(&self) -> FieldType<T> {
            FieldType::builtin()
        }
    }

    /// Level 1: unsupported
    pub trait ViaUnsupported {
        /// Probed type
        type Value;
        /// Resolved field type
        fn field_type(&self) -> FieldType<Self::Value>;
    }

    impl<T> ViaUnsupported for Probe<T> {
        type Value = T;
        fn field_type(&self) -> FieldType<T> {
            FieldType::unsupported()
        }
    }
}
