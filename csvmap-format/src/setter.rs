//! Setter factory
//!
//! Turns a field's [`FieldType`] and an accessor into the closures that write
//! parsed values into a record. Setters are built once per plan and shared by
//! every read performed through it.

use std::sync::Arc;

use crate::capability::{Capability, FieldType};
use crate::error::{CsvMapError, Result};
use crate::value::ValueKind;

/// Raw column value handed to a setter
#[derive(Debug, Clone, Copy)]
pub struct SetterInput<'a> {
    /// Raw text of the column
    pub value: &'a str,
    /// Whether the column was quoted in the source
    pub quoted: bool,
    /// Empty-values policy: empty text becomes the zero value for scalars
    pub empty_as_zero: bool,
    /// Every field of the record being read
    pub record: &'a [String],
}

/// Parses a column value into a record field
pub type Setter<R> = Arc<dyn Fn(&mut R, &SetterInput<'_>) -> Result<()> + Send + Sync>;
/// Writes the line number into a record field
pub type LineSetter<R> = Arc<dyn Fn(&mut R, usize) + Send + Sync>;
/// Writes the record's fields into a record field
pub type RecordSetter<R> = Arc<dyn Fn(&mut R, &[String]) + Send + Sync>;
/// Writes the record's raw text into a record field
pub type RawLineSetter<R> = Arc<dyn Fn(&mut R, &[u8]) + Send + Sync>;
/// Projects a record onto one of its fields
pub type Accessor<R, T> = Arc<dyn Fn(&mut R) -> &mut T + Send + Sync>;

type Parser<T> = Arc<dyn Fn(&SetterInput<'_>) -> Result<T> + Send + Sync>;

/// Box an accessor closure
pub fn accessor<R, T, F>(access: F) -> Accessor<R, T>
where
    F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
{
    Arc::new(access)
}

/// Box a setter closure
pub fn setter<R, F>(set: F) -> Setter<R>
where
    F: Fn(&mut R, &SetterInput<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(set)
}

fn parser<T: 'static>(ty: &FieldType<T>) -> Result<Parser<T>> {
    let parse: Parser<T> = match ty.capability {
        Capability::Record(hook) => Arc::new(move |input: &SetterInput<'_>| {
            hook(input.value, input.record).map_err(CsvMapError::Custom)
        }),
        Capability::Quoted(hook) => Arc::new(move |input: &SetterInput<'_>| {
            hook(input.value, input.quoted, input.record).map_err(CsvMapError::Custom)
        }),
        Capability::Text(hook) => Arc::new(move |input: &SetterInput<'_>| {
            hook(input.value).map_err(CsvMapError::Custom)
        }),
        Capability::Builtin { kind, parse } if kind != ValueKind::Bytes => {
            Arc::new(move |input: &SetterInput<'_>| parse(input.value, input.empty_as_zero))
        }
        _ => return Err(CsvMapError::UnsupportedType(ty.type_name.to_string())),
    };
    Ok(parse)
}

/// Setter for a plain field of type `T`
pub fn column_setter<R: 'static, T: 'static>(
    access: Accessor<R, T>,
    ty: &FieldType<T>,
) -> Result<Setter<R>> {
    let parse = parser(ty)?;
    Ok(setter(move |record: &mut R, input: &SetterInput<'_>| {
        let value = parse(input)?;
        *access(record) = value;
        Ok(())
    }))
}

/// Setter for an `Option<T>` field.
///
/// Empty unquoted text yields `None`. Empty quoted text yields `Some` only for
/// string fields and custom unmarshalers; scalar primitives treat any empty
/// text as `None`.
pub fn optional_setter<R: 'static, T: 'static>(
    access: Accessor<R, Option<T>>,
    ty: &FieldType<T>,
) -> Result<Setter<R>> {
    let honours_quotes = match ty.capability {
        capability if capability.is_custom() => true,
        Capability::Builtin {
            kind: ValueKind::Str,
            ..
        } => true,
        Capability::Builtin { kind, .. } if kind.is_scalar() => false,
        _ => return Err(CsvMapError::UnsupportedType(format!("Option<{}>", ty.type_name))),
    };
    let parse = parser(ty)?;
    Ok(setter(move |record: &mut R, input: &SetterInput<'_>| {
        if input.value.is_empty() && !(honours_quotes && input.quoted) {
            *access(record) = None;
            return Ok(());
        }
        let value = parse(input)?;
        *access(record) = Some(value);
        Ok(())
    }))
}

/// `[line]` setter, if the type supports it
pub fn line_setter<R: 'static, T: 'static>(
    access: Accessor<R, T>,
    ty: &FieldType<T>,
) -> Option<LineSetter<R>> {
    let convert = ty.captures.line?;
    Some(Arc::new(move |record: &mut R, line: usize| {
        *access(record) = convert(line);
    }))
}

/// `[raw]` setter, if the type supports it
pub fn record_setter<R: 'static, T: 'static>(
    access: Accessor<R, T>,
    ty: &FieldType<T>,
) -> Option<RecordSetter<R>> {
    let convert = ty.captures.record?;
    Some(Arc::new(move |record: &mut R, fields: &[String]| {
        *access(record) = convert(fields);
    }))
}

/// `[rawData]` setter, if the type supports it
pub fn raw_line_setter<R: 'static, T: 'static>(
    access: Accessor<R, T>,
    ty: &FieldType<T>,
) -> Option<RawLineSetter<R>> {
    let convert = ty.captures.raw_line?;
    Some(Arc::new(move |record: &mut R, raw: &[u8]| {
        *access(record) = convert(raw);
    }))
}
