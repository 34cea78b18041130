//! Built-in value parsing for primitive field types

use crate::capability::Captures;
use crate::error::{CsvMapError, Result};

/// Shape of a built-in value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `bool`
    Bool,
    /// Signed integers
    Int,
    /// Unsigned integers
    Uint,
    /// `f32` / `f64`
    Float,
    /// `String`
    Str,
    /// `Vec<String>`, comma separated
    StrList,
    /// `Vec<u8>`, only usable as a `[rawData]` capture
    Bytes,
}

impl ValueKind {
    /// Whether an empty raw value may be substituted by the zero value
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ValueKind::Bool | ValueKind::Int | ValueKind::Uint | ValueKind::Float
        )
    }
}

/// Types with a built-in column parser
pub trait BuiltinValue: Sized + 'static {
    /// Type name used in error messages
    const TYPE_NAME: &'static str;
    /// Value shape
    const KIND: ValueKind;

    /// Parse a raw column value; `empty_as_zero` substitutes the zero value for empty text
    fn parse_value(raw: &str, empty_as_zero: bool) -> Result<Self>;

    /// Special captures supported by this type
    fn captures() -> Captures<Self> {
        Captures::none()
    }
}

/// Build the parse error for `raw` and the target type name
pub fn parse_error(raw: &str, target: &'static str) -> CsvMapError {
    CsvMapError::Parse {
        value: raw.to_string(),
        target,
    }
}

/// Parse a boolean the way `1`, `t`, `TRUE`, `0`, `f`, `False` etc. are commonly written
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl BuiltinValue for bool {
    const TYPE_NAME: &'static str = "bool";
    const KIND: ValueKind = ValueKind::Bool;

    fn parse_value(raw: &str, empty_as_zero: bool) -> Result<Self> {
        if empty_as_zero && raw.is_empty() {
            return Ok(false);
        }
        parse_bool(raw).ok_or_else(|| parse_error(raw, Self::TYPE_NAME))
    }
}

macro_rules! numeric_value {
    ($kind:expr, $zero:expr; $($ty:ty),+) => {
        $(
            impl BuiltinValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);
                const KIND: ValueKind = $kind;

                fn parse_value(raw: &str, empty_as_zero: bool) -> Result<Self> {
                    if empty_as_zero && raw.is_empty() {
                        return Ok($zero);
                    }
                    raw.parse::<$ty>()
                        .map_err(|_| parse_error(raw, Self::TYPE_NAME))
                }
            }
        )+
    };
}

numeric_value!(ValueKind::Int, 0; i8, i16, i32);
numeric_value!(ValueKind::Uint, 0; u8, u16, u32);
numeric_value!(ValueKind::Float, 0.0; f32, f64);

// Integer types wide enough to hold a line number also support `[line]`.
macro_rules! line_value {
    ($kind:expr; $($ty:ty),+) => {
        $(
            impl BuiltinValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);
                const KIND: ValueKind = $kind;

                fn parse_value(raw: &str, empty_as_zero: bool) -> Result<Self> {
                    if empty_as_zero && raw.is_empty() {
                        return Ok(0);
                    }
                    raw.parse::<$ty>()
                        .map_err(|_| parse_error(raw, Self::TYPE_NAME))
                }

                fn captures() -> Captures<Self> {
                    Captures {
                        line: Some(|line: usize| line as $ty),
                        ..Captures::none()
                    }
                }
            }
        )+
    };
}

line_value!(ValueKind::Int; i64, isize);
line_value!(ValueKind::Uint; u64, usize);

impl BuiltinValue for String {
    const TYPE_NAME: &'static str = "String";
    const KIND: ValueKind = ValueKind::Str;

    fn parse_value(raw: &str, _empty_as_zero: bool) -> Result<Self> {
        Ok(raw.to_string())
    }

    fn captures() -> Captures<Self> {
        Captures {
            raw_line: Some(|raw: &[u8]| String::from_utf8_lossy(raw).into_owned()),
            ..Captures::none()
        }
    }
}

impl BuiltinValue for Vec<String> {
    const TYPE_NAME: &'static str = "Vec<String>";
    const KIND: ValueKind = ValueKind::StrList;

    fn parse_value(raw: &str, _empty_as_zero: bool) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        Ok(raw.split(',').map(str::to_string).collect())
    }

    fn captures() -> Captures<Self> {
        Captures {
            record: Some(|record: &[String]| record.to_vec()),
            ..Captures::none()
        }
    }
}

impl BuiltinValue for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";
    const KIND: ValueKind = ValueKind::Bytes;

    fn parse_value(_raw: &str, _empty_as_zero: bool) -> Result<Self> {
        Err(CsvMapError::UnsupportedType(Self::TYPE_NAME.to_string()))
    }

    fn captures() -> Captures<Self> {
        Captures {
            raw_line: Some(|raw: &[u8]| raw.to_vec()),
            ..Captures::none()
        }
    }
}
