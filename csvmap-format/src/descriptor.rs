//! Record type descriptions
//!
//! A record type lists its fields as [`FieldDescriptor`]s, normally via
//! `#[derive(CsvRecord)]`. Each leaf field carries a type-erased [`Binder`]
//! that can produce the setters for any binding the plan builder picks.

use std::sync::Arc;

use crate::capability::{Capability, FieldType};
use crate::error::{CsvMapError, Result};
use crate::setter::{
    self, accessor, Accessor, LineSetter, RawLineSetter, RecordSetter, Setter, SetterInput,
};

/// A record type that rows can be mapped onto
pub trait CsvRecord: Default + Sized + 'static {
    /// The record's visible fields, in declaration order
    fn fields() -> Vec<FieldDescriptor<Self>>;
}

/// Produces setters for one leaf field of `R`
pub trait Binder<R>: Send + Sync {
    /// Declared type of the field
    fn type_name(&self) -> &str;

    /// Setter for a positional or named column binding
    fn column_setter(&self) -> Result<Setter<R>>;

    /// Setter for `[line]`, `None` if the type cannot hold a line number
    fn line_setter(&self) -> Option<LineSetter<R>>;

    /// Setter for `[raw]`, `None` if the type cannot hold the record's fields
    fn record_setter(&self) -> Option<RecordSetter<R>>;

    /// Setter for `[rawData]`, `None` if the type cannot hold raw text
    fn raw_line_setter(&self) -> Option<RawLineSetter<R>>;
}

/// One field of a record type
pub struct FieldDescriptor<R> {
    name: String,
    annotation: Option<String>,
    kind: FieldKind<R>,
}

/// Leaf or nested record
pub enum FieldKind<R> {
    /// Directly bindable field
    Leaf(Arc<dyn Binder<R>>),
    /// Substructure whose fields are visited instead
    Nested {
        /// Declared type of the substructure
        type_name: &'static str,
        /// Flattened into the parent without a name prefix
        embedded: bool,
        /// The substructure's fields, projected onto `R`
        fields: Vec<FieldDescriptor<R>>,
    },
}

impl<R: 'static> FieldDescriptor<R> {
    /// Describe a field of type `T`
    pub fn new<T: 'static, F>(
        name: &str,
        annotation: Option<&str>,
        ty: FieldType<T>,
        access: F,
    ) -> Self
    where
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        let access = accessor(access);
        let kind = match ty.capability {
            Capability::Nested(fields) => FieldKind::Nested {
                type_name: ty.type_name,
                embedded: false,
                fields: lift_all(fields(), &access),
            },
            _ => FieldKind::Leaf(Arc::new(TypedBinder { access, ty })),
        };
        Self::with_kind(name, annotation, kind)
    }

    /// Describe an optional field of type `Option<T>`
    pub fn optional<T: 'static, F>(
        name: &str,
        annotation: Option<&str>,
        ty: FieldType<T>,
        access: F,
    ) -> Self
    where
        F: Fn(&mut R) -> &mut Option<T> + Send + Sync + 'static,
    {
        let binder = OptionalBinder {
            access: accessor(access),
            type_name: format!("Option<{}>", ty.type_name),
            ty,
        };
        Self::with_kind(name, annotation, FieldKind::Leaf(Arc::new(binder)))
    }

    /// Describe an embedded record whose fields are flattened into `R`
    pub fn flatten<T: CsvRecord, F>(name: &str, access: F) -> Self
    where
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        let access = accessor(access);
        let kind = FieldKind::Nested {
            type_name: std::any::type_name::<T>(),
            embedded: true,
            fields: lift_all(T::fields(), &access),
        };
        Self::with_kind(name, None, kind)
    }

    /// Describe a field from an existing kind
    pub fn with_kind(name: &str, annotation: Option<&str>, kind: FieldKind<R>) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            annotation: annotation.map(str::to_string),
            kind,
        }
    }
}

impl<R> FieldDescriptor<R> {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw annotation, if any
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// Leaf or nested
    pub fn kind(&self) -> &FieldKind<R> {
        &self.kind
    }

    /// Split into name, annotation and kind
    pub fn into_parts(self) -> (String, Option<String>, FieldKind<R>) {
        (self.name, self.annotation, self.kind)
    }
}

fn lift_all<R: 'static, T: 'static>(
    fields: Vec<FieldDescriptor<T>>,
    outer: &Accessor<R, T>,
) -> Vec<FieldDescriptor<R>> {
    fields.into_iter().map(|field| lift(field, outer)).collect()
}

fn lift<R: 'static, T: 'static>(field: FieldDescriptor<T>, outer: &Accessor<R, T>) -> FieldDescriptor<R> {
    let kind = match field.kind {
        FieldKind::Leaf(inner) => FieldKind::Leaf(Arc::new(LiftedBinder {
            outer: Arc::clone(outer),
            inner,
        })),
        FieldKind::Nested {
            type_name,
            embedded,
            fields,
        } => FieldKind::Nested {
            type_name,
            embedded,
            fields: lift_all(fields, outer),
        },
    };
    FieldDescriptor {
        name: field.name,
        annotation: field.annotation,
        kind,
    }
}

struct TypedBinder<R, T> {
    access: Accessor<R, T>,
    ty: FieldType<T>,
}

impl<R: 'static, T: 'static> Binder<R> for TypedBinder<R, T> {
    fn type_name(&self) -> &str {
        self.ty.type_name
    }

    fn column_setter(&self) -> Result<Setter<R>> {
        setter::column_setter(Arc::clone(&self.access), &self.ty)
    }

    fn line_setter(&self) -> Option<LineSetter<R>> {
        setter::line_setter(Arc::clone(&self.access), &self.ty)
    }

    fn record_setter(&self) -> Option<RecordSetter<R>> {
        setter::record_setter(Arc::clone(&self.access), &self.ty)
    }

    fn raw_line_setter(&self) -> Option<RawLineSetter<R>> {
        setter::raw_line_setter(Arc::clone(&self.access), &self.ty)
    }
}

struct OptionalBinder<R, T> {
    access: Accessor<R, Option<T>>,
    type_name: String,
    ty: FieldType<T>,
}

impl<R: 'static, T: 'static> Binder<R> for OptionalBinder<R, T> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn column_setter(&self) -> Result<Setter<R>> {
        setter::optional_setter(Arc::clone(&self.access), &self.ty)
    }

    fn line_setter(&self) -> Option<LineSetter<R>> {
        None
    }

    fn record_setter(&self) -> Option<RecordSetter<R>> {
        None
    }

    fn raw_line_setter(&self) -> Option<RawLineSetter<R>> {
        None
    }
}

struct LiftedBinder<R, T> {
    outer: Accessor<R, T>,
    inner: Arc<dyn Binder<T>>,
}

impl<R: 'static, T: 'static> Binder<R> for LiftedBinder<R, T> {
    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn column_setter(&self) -> Result<Setter<R>> {
        let inner = self.inner.column_setter()?;
        let outer = Arc::clone(&self.outer);
        Ok(setter::setter(
            move |record: &mut R, input: &SetterInput<'_>| inner(outer(record), input),
        ))
    }

    fn line_setter(&self) -> Option<LineSetter<R>> {
        let inner = self.inner.line_setter()?;
        let outer = Arc::clone(&self.outer);
        Some(Arc::new(move |record: &mut R, line: usize| {
            inner(outer(record), line)
        }))
    }

    fn record_setter(&self) -> Option<RecordSetter<R>> {
        let inner = self.inner.record_setter()?;
        let outer = Arc::clone(&self.outer);
        Some(Arc::new(move |record: &mut R, fields: &[String]| {
            inner(outer(record), fields)
        }))
    }

    fn raw_line_setter(&self) -> Option<RawLineSetter<R>> {
        let inner = self.inner.raw_line_setter()?;
        let outer = Arc::clone(&self.outer);
        Some(Arc::new(move |record: &mut R, raw: &[u8]| {
            inner(outer(record), raw)
        }))
    }
}

/// Binder for a field that can never be bound to a column
pub struct UnsupportedBinder {
    type_name: String,
}

impl UnsupportedBinder {
    /// Binder reporting `type_name` as unsupported
    pub fn new(type_name: impl Into<String>) -> Self {
        UnsupportedBinder {
            type_name: type_name.into(),
        }
    }
}

impl<R> Binder<R> for UnsupportedBinder {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn column_setter(&self) -> Result<Setter<R>> {
        Err(CsvMapError::UnsupportedType(self.type_name.clone()))
    }

    fn line_setter(&self) -> Option<LineSetter<R>> {
        None
    }

    fn record_setter(&self) -> Option<RecordSetter<R>> {
        None
    }

    fn raw_line_setter(&self) -> Option<RawLineSetter<R>> {
        None
    }
}
