//! Override mappings and copy-on-write plan adaptation

use serde::{Deserialize, Serialize};

use csvmap_format::{CsvMapError, MapperOptions, Result};

use crate::plan::{Binding, MappingPlan};

/// One instruction changing a field's binding.
///
/// `index` and `name` are evaluated in this order:
///
/// 1. negative `index` removes the field's positional binding
/// 2. `name` starting with `-` removes the field's named binding
/// 3. positive `index` binds the field to that column
/// 4. non-empty `name` binds the field to that header
///
/// Anything else leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideMapping {
    /// Field identity (dotted path for named nested records)
    pub field: String,
    /// 1-based column index, 0 for unspecified
    pub index: isize,
    /// Column header name, empty for unspecified
    pub name: String,
}

impl OverrideMapping {
    /// Bind `field` to positional column `index`
    pub fn index(field: impl Into<String>, index: usize) -> Self {
        OverrideMapping {
            field: field.into(),
            index: index as isize,
            name: String::new(),
        }
    }

    /// Bind `field` to the column with header `name`
    pub fn name(field: impl Into<String>, name: impl Into<String>) -> Self {
        OverrideMapping {
            field: field.into(),
            index: 0,
            name: name.into(),
        }
    }

    /// Remove the positional binding of `field`
    pub fn remove_index(field: impl Into<String>) -> Self {
        OverrideMapping {
            field: field.into(),
            index: -1,
            name: String::new(),
        }
    }

    /// Remove the named binding of `field`
    pub fn remove_name(field: impl Into<String>, name: impl Into<String>) -> Self {
        OverrideMapping {
            field: field.into(),
            index: 0,
            name: format!("-{}", name.into()),
        }
    }
}

impl<R> MappingPlan<R> {
    /// Derive a new plan with `overrides` applied.
    ///
    /// With `clear` the derived plan starts without positional or named
    /// bindings; special captures are always kept. `options` replaces the
    /// plan's options when given. `self` is never modified.
    pub fn adapt(
        &self,
        clear: bool,
        overrides: &[OverrideMapping],
        options: Option<MapperOptions>,
    ) -> Result<Self> {
        let mut plan = self.clone();
        if clear {
            plan.columns.clear();
            plan.names.clear();
            plan.bound.clear();
        }
        if let Some(options) = options {
            plan.options = options;
        }

        for mapping in overrides {
            let id = plan
                .fields
                .lookup(&mapping.field)
                .ok_or_else(|| CsvMapError::FieldNotFound(mapping.field.clone()))?;

            if mapping.index < 0 {
                if matches!(plan.bound.get(&id), Some(b) if matches!(b.binding, Binding::Index(_))) {
                    plan.unbind(id);
                }
                tracing::debug!(field = %mapping.field, "override removed positional binding");
            } else if mapping.name.starts_with('-') {
                if matches!(plan.bound.get(&id), Some(b) if matches!(b.binding, Binding::Name(_))) {
                    plan.unbind(id);
                }
                tracing::debug!(field = %mapping.field, "override removed named binding");
            } else if mapping.index > 0 {
                let setter = plan.fields.slot(id).binder.column_setter()?;
                let binding = Binding::Index(mapping.index as usize);
                tracing::debug!(field = %mapping.field, binding = %binding, "override rebound field");
                plan.rebind(id, binding, setter);
            } else if !mapping.name.is_empty() {
                let setter = plan.fields.slot(id).binder.column_setter()?;
                let binding = Binding::Name(mapping.name.clone());
                tracing::debug!(field = %mapping.field, binding = %binding, "override rebound field");
                plan.rebind(id, binding, setter);
            }
        }
        Ok(plan)
    }

    /// Current bindings in structural (declaration) order
    pub fn mappings(&self) -> Vec<OverrideMapping> {
        self.bound
            .iter()
            .map(|(id, bound)| {
                let field = self.fields.slot(*id).identity.clone();
                match &bound.binding {
                    Binding::Index(index) => OverrideMapping::index(field, *index),
                    Binding::Name(name) => OverrideMapping::name(field, name.clone()),
                }
            })
            .collect()
    }
}
