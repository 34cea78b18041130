//! Mapping plan construction
//!
//! A [`MappingPlan`] is built once per record type (and option set) by walking
//! the type's field descriptors depth-first. Every leaf field gets a slot in a
//! shared arena; the plan's binding tables refer to slots by [`FieldId`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use csvmap_format::annotation::{Annotation, TAG_LINE, TAG_RAW, TAG_RAW_DATA, TAG_SKIP};
use csvmap_format::descriptor::UnsupportedBinder;
use csvmap_format::setter::{LineSetter, RawLineSetter, RecordSetter, Setter};
use csvmap_format::{Binder, CsvMapError, CsvRecord, FieldDescriptor, FieldKind, MapperOptions, Result};

/// Position of a leaf field in depth-first declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(usize);

impl FieldId {
    /// Arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a field's column value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// 1-based positional column
    Index(usize),
    /// Column header name
    Name(String),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Index(index) => write!(f, "[{index}]"),
            Binding::Name(name) => write!(f, "{name:?}"),
        }
    }
}

pub(crate) struct FieldSlot<R> {
    pub(crate) identity: String,
    pub(crate) path: Vec<usize>,
    pub(crate) binder: Arc<dyn Binder<R>>,
}

/// Every leaf field of a record type, shared by all plans derived from one build
pub(crate) struct FieldArena<R> {
    pub(crate) slots: Vec<FieldSlot<R>>,
    pub(crate) by_identity: HashMap<String, FieldId>,
}

impl<R> FieldArena<R> {
    pub(crate) fn slot(&self, id: FieldId) -> &FieldSlot<R> {
        &self.slots[id.0]
    }

    pub(crate) fn lookup(&self, identity: &str) -> Option<FieldId> {
        self.by_identity.get(identity).copied()
    }
}

/// Line, raw-record and raw-line captures
pub struct SpecialBindings<R> {
    /// `[line]`
    pub line: Option<LineSetter<R>>,
    /// `[raw]`
    pub record: Option<RecordSetter<R>>,
    /// `[rawData]`
    pub raw_line: Option<RawLineSetter<R>>,
}

impl<R> SpecialBindings<R> {
    /// True if no capture is configured
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.record.is_none() && self.raw_line.is_none()
    }

    fn count(&self) -> usize {
        [
            self.line.is_some(),
            self.record.is_some(),
            self.raw_line.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

impl<R> Default for SpecialBindings<R> {
    fn default() -> Self {
        SpecialBindings {
            line: None,
            record: None,
            raw_line: None,
        }
    }
}

impl<R> Clone for SpecialBindings<R> {
    fn clone(&self) -> Self {
        SpecialBindings {
            line: self.line.clone(),
            record: self.record.clone(),
            raw_line: self.raw_line.clone(),
        }
    }
}

/// A field's current binding and the setter derived for it
pub struct BoundField<R> {
    /// Column the field reads from
    pub binding: Binding,
    /// Parses the column value into the field
    pub setter: Setter<R>,
}

impl<R> Clone for BoundField<R> {
    fn clone(&self) -> Self {
        BoundField {
            binding: self.binding.clone(),
            setter: Arc::clone(&self.setter),
        }
    }
}

/// Immutable compiled bindings for one record type configuration.
///
/// Plans are never mutated once built; [`MappingPlan::adapt`] derives a new
/// plan sharing the field arena and all unaffected setters.
pub struct MappingPlan<R> {
    pub(crate) fields: Arc<FieldArena<R>>,
    pub(crate) specials: SpecialBindings<R>,
    pub(crate) columns: BTreeMap<usize, FieldId>,
    pub(crate) names: HashMap<String, FieldId>,
    pub(crate) bound: BTreeMap<FieldId, BoundField<R>>,
    pub(crate) options: MapperOptions,
}

impl<R> Clone for MappingPlan<R> {
    fn clone(&self) -> Self {
        MappingPlan {
            fields: Arc::clone(&self.fields),
            specials: self.specials.clone(),
            columns: self.columns.clone(),
            names: self.names.clone(),
            bound: self.bound.clone(),
            options: self.options,
        }
    }
}

impl<R> fmt::Debug for MappingPlan<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: Vec<(&str, &Binding)> = self
            .bound
            .iter()
            .map(|(id, bound)| (self.fields.slot(*id).identity.as_str(), &bound.binding))
            .collect();
        f.debug_struct("MappingPlan")
            .field("bindings", &bindings)
            .field("specials", &self.specials.count())
            .field("options", &self.options)
            .finish()
    }
}

impl<R: CsvRecord> MappingPlan<R> {
    /// Build the plan for `R` with default options
    pub fn new() -> Result<Self> {
        Self::with_options(MapperOptions::default())
    }

    /// Build the plan for `R`
    pub fn with_options(options: MapperOptions) -> Result<Self> {
        let mut builder = PlanBuilder::new();
        builder.visit(R::fields(), &[], &[])?;
        let plan = builder.finish(options);
        tracing::debug!(
            record = std::any::type_name::<R>(),
            fields = plan.fields.slots.len(),
            positional = plan.columns.len(),
            named = plan.names.len(),
            specials = plan.specials.count(),
            "built mapping plan"
        );
        Ok(plan)
    }
}

impl<R> MappingPlan<R> {
    /// Setter bound to 1-based positional column `index`
    pub fn column(&self, index: usize) -> Option<&Setter<R>> {
        let id = self.columns.get(&index)?;
        self.bound.get(id).map(|bound| &bound.setter)
    }

    /// Positional bindings, ordered by column index
    pub fn columns(&self) -> impl Iterator<Item = (usize, &Setter<R>)> + '_ {
        self.columns
            .iter()
            .filter_map(|(index, id)| self.bound.get(id).map(|bound| (*index, &bound.setter)))
    }

    /// Named bindings in field order
    pub fn named(&self) -> impl Iterator<Item = (&str, &Setter<R>)> + '_ {
        self.bound.values().filter_map(|bound| match &bound.binding {
            Binding::Name(name) => Some((name.as_str(), &bound.setter)),
            Binding::Index(_) => None,
        })
    }

    /// True if any field is bound by header name
    pub fn has_named(&self) -> bool {
        !self.names.is_empty()
    }

    /// Special captures
    pub fn specials(&self) -> &SpecialBindings<R> {
        &self.specials
    }

    /// Options the plan was built or adapted with
    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Current binding of the field with the given identity
    pub fn binding(&self, identity: &str) -> Option<&Binding> {
        let id = self.fields.lookup(identity)?;
        self.bound.get(&id).map(|bound| &bound.binding)
    }

    /// Structural path (descriptor positions from the root) of a field
    pub fn field_path(&self, identity: &str) -> Option<&[usize]> {
        let id = self.fields.lookup(identity)?;
        Some(self.fields.slot(id).path.as_slice())
    }

    /// Number of positional plus named bindings
    pub fn binding_count(&self) -> usize {
        self.bound.len()
    }

    /// Bind `id` to a column, displacing whichever field held that column
    pub(crate) fn rebind(&mut self, id: FieldId, binding: Binding, setter: Setter<R>) {
        self.unbind(id);
        let displaced = match &binding {
            Binding::Index(index) => self.columns.insert(*index, id),
            Binding::Name(name) => self.names.insert(name.clone(), id),
        };
        if let Some(other) = displaced {
            tracing::debug!(
                field = %self.fields.slot(other).identity,
                binding = %binding,
                "override displaced existing binding"
            );
            self.bound.remove(&other);
        }
        self.bound.insert(id, BoundField { binding, setter });
    }

    /// Drop whatever binding `id` has
    pub(crate) fn unbind(&mut self, id: FieldId) -> Option<Binding> {
        let bound = self.bound.remove(&id)?;
        match &bound.binding {
            Binding::Index(index) => {
                self.columns.remove(index);
            }
            Binding::Name(name) => {
                self.names.remove(name);
            }
        }
        Some(bound.binding)
    }
}

struct PlanBuilder<R> {
    slots: Vec<FieldSlot<R>>,
    by_identity: HashMap<String, FieldId>,
    specials: SpecialBindings<R>,
    special_owners: HashMap<&'static str, String>,
    columns: BTreeMap<usize, FieldId>,
    names: HashMap<String, FieldId>,
    bound: BTreeMap<FieldId, BoundField<R>>,
    next_index: usize,
}

impl<R: 'static> PlanBuilder<R> {
    fn new() -> Self {
        PlanBuilder {
            slots: Vec::new(),
            by_identity: HashMap::new(),
            specials: SpecialBindings::default(),
            special_owners: HashMap::new(),
            columns: BTreeMap::new(),
            names: HashMap::new(),
            bound: BTreeMap::new(),
            next_index: 1,
        }
    }

    fn visit(
        &mut self,
        fields: Vec<FieldDescriptor<R>>,
        prefix: &[String],
        path: &[usize],
    ) -> Result<()> {
        for (position, field) in fields.into_iter().enumerate() {
            let (name, annotation, kind) = field.into_parts();
            let mut field_path = path.to_vec();
            field_path.push(position);

            match kind {
                FieldKind::Nested {
                    embedded: true,
                    fields,
                    ..
                } => self.visit(fields, prefix, &field_path)?,
                FieldKind::Nested {
                    type_name, fields, ..
                } => {
                    let identity = qualify(prefix, &name);
                    match annotation.as_deref() {
                        None => {
                            let mut nested_prefix = prefix.to_vec();
                            nested_prefix.push(name);
                            self.visit(fields, &nested_prefix, &field_path)?;
                        }
                        Some("") | Some(TAG_SKIP) => {
                            self.register(
                                identity,
                                field_path,
                                Arc::new(UnsupportedBinder::new(type_name)),
                            )?;
                        }
                        Some(_) => return Err(CsvMapError::NestedAnnotated(identity)),
                    }
                }
                FieldKind::Leaf(binder) => {
                    let identity = qualify(prefix, &name);
                    let annotation = Annotation::parse(annotation.as_deref(), &identity)?;
                    let id = self.register(identity, field_path, binder)?;
                    self.bind(id, annotation)?;
                }
            }
        }
        Ok(())
    }

    fn register(
        &mut self,
        identity: String,
        path: Vec<usize>,
        binder: Arc<dyn Binder<R>>,
    ) -> Result<FieldId> {
        if self.by_identity.contains_key(&identity) {
            return Err(CsvMapError::DuplicateField(identity));
        }
        let id = FieldId(self.slots.len());
        self.by_identity.insert(identity.clone(), id);
        self.slots.push(FieldSlot {
            identity,
            path,
            binder,
        });
        Ok(id)
    }

    fn bind(&mut self, id: FieldId, annotation: Annotation) -> Result<()> {
        match annotation {
            Annotation::Line => {
                let setter = self.slots[id.0].binder.line_setter();
                let setter = self.special(id, TAG_LINE, "an integer (usize, isize, u64, i64)", setter)?;
                self.specials.line = Some(setter);
            }
            Annotation::Raw => {
                let setter = self.slots[id.0].binder.record_setter();
                let setter = self.special(id, TAG_RAW, "Vec<String>", setter)?;
                self.specials.record = Some(setter);
            }
            Annotation::RawData => {
                let setter = self.slots[id.0].binder.raw_line_setter();
                let setter = self.special(id, TAG_RAW_DATA, "String or Vec<u8>", setter)?;
                self.specials.raw_line = Some(setter);
            }
            Annotation::Index(index) => {
                self.bind_column(id, index)?;
                self.next_index = index + 1;
            }
            Annotation::Implicit => {
                self.bind_column(id, self.next_index)?;
                self.next_index += 1;
            }
            Annotation::Name(name) => self.bind_name(id, name)?,
            Annotation::Skip => {
                tracing::trace!(field = %self.slots[id.0].identity, "skipped field");
            }
        }
        Ok(())
    }

    fn special<S>(
        &mut self,
        id: FieldId,
        tag: &'static str,
        expected: &'static str,
        setter: Option<S>,
    ) -> Result<S> {
        let identity = &self.slots[id.0].identity;
        let setter = setter.ok_or_else(|| CsvMapError::SpecialFieldType {
            tag,
            expected,
            field: identity.clone(),
        })?;
        if let Some(existing) = self.special_owners.get(tag) {
            return Err(CsvMapError::DuplicateSpecial {
                tag,
                field: identity.clone(),
                existing: existing.clone(),
            });
        }
        tracing::trace!(field = %identity, tag, "bound special capture");
        self.special_owners.insert(tag, identity.clone());
        Ok(setter)
    }

    fn bind_column(&mut self, id: FieldId, index: usize) -> Result<()> {
        if let Some(existing) = self.columns.get(&index) {
            return Err(CsvMapError::DuplicateIndex {
                index,
                field: self.slots[id.0].identity.clone(),
                existing: self.slots[existing.0].identity.clone(),
            });
        }
        let setter = self.slots[id.0].binder.column_setter()?;
        tracing::trace!(field = %self.slots[id.0].identity, index, "bound positional column");
        self.columns.insert(index, id);
        self.bound.insert(
            id,
            BoundField {
                binding: Binding::Index(index),
                setter,
            },
        );
        Ok(())
    }

    fn bind_name(&mut self, id: FieldId, name: String) -> Result<()> {
        if let Some(existing) = self.names.get(&name) {
            return Err(CsvMapError::DuplicateName {
                name,
                field: self.slots[id.0].identity.clone(),
                existing: self.slots[existing.0].identity.clone(),
            });
        }
        let setter = self.slots[id.0].binder.column_setter()?;
        tracing::trace!(field = %self.slots[id.0].identity, name = %name, "bound named column");
        self.names.insert(name.clone(), id);
        self.bound.insert(
            id,
            BoundField {
                binding: Binding::Name(name),
                setter,
            },
        );
        Ok(())
    }

    fn finish(self, options: MapperOptions) -> MappingPlan<R> {
        MappingPlan {
            fields: Arc::new(FieldArena {
                slots: self.slots,
                by_identity: self.by_identity,
            }),
            specials: self.specials,
            columns: self.columns,
            names: self.names,
            bound: self.bound,
            options,
        }
    }
}

fn qualify(prefix: &[String], name: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    let mut identity = prefix.join(".");
    identity.push('.');
    identity.push_str(name);
    identity
}
