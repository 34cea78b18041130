//! High-level mapper API

use std::io::{BufReader, Read};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use csvmap_codec::{MappingPlan, OverrideMapping};
use csvmap_format::{CsvRecord, MapperOptions, Result};

use crate::raw::RawReader;
use crate::reader::ReaderContext;
use crate::tokenizer::{CsvTokenizer, TokenizerOptions};

/// Full mapper configuration, typically loaded from a file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Mapper-wide options
    #[serde(flatten)]
    pub options: MapperOptions,
    /// Drop the record type's declared bindings before applying `overrides`
    pub clear: bool,
    /// Binding overrides
    pub overrides: Vec<OverrideMapping>,
}

/// Maps CSV records onto `R`.
///
/// Cloning is cheap; clones share the same immutable plan.
pub struct Mapper<R> {
    plan: Arc<MappingPlan<R>>,
}

impl<R> Clone for Mapper<R> {
    fn clone(&self) -> Self {
        Self {
            plan: Arc::clone(&self.plan),
        }
    }
}

impl<R> std::fmt::Debug for Mapper<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper").field("plan", &self.plan).finish()
    }
}

impl<R: CsvRecord> Mapper<R> {
    /// Mapper with default options
    pub fn new() -> Result<Self> {
        Self::with_options(MapperOptions::default())
    }

    /// Mapper with the given options
    pub fn with_options(options: MapperOptions) -> Result<Self> {
        Ok(Self::from_plan(MappingPlan::with_options(options)?))
    }

    /// Mapper built from a configuration
    pub fn from_config(config: &MapperConfig) -> Result<Self> {
        let plan = MappingPlan::with_options(config.options)?;
        if !config.clear && config.overrides.is_empty() {
            return Ok(Self::from_plan(plan));
        }
        Ok(Self::from_plan(plan.adapt(
            config.clear,
            &config.overrides,
            None,
        )?))
    }

    /// Read records from `input`; fails on invalid tokenizer options
    pub fn reader<I: Read>(
        &self,
        input: I,
        options: TokenizerOptions,
    ) -> Result<ReaderContext<R, CsvTokenizer<BufReader<I>>>> {
        let tokenizer = CsvTokenizer::new(BufReader::new(input), options)?;
        Ok(self.reader_context(tokenizer))
    }

    /// Read records from an existing record source
    pub fn reader_context<S: RawReader>(&self, source: S) -> ReaderContext<R, S> {
        ReaderContext::new(source, Arc::clone(&self.plan))
    }
}

impl<R> Mapper<R> {
    /// Mapper over an existing plan
    pub fn from_plan(plan: MappingPlan<R>) -> Self {
        Self {
            plan: Arc::new(plan),
        }
    }

    /// Derive a new mapper with `overrides` applied; `self` is unchanged
    pub fn adapt(
        &self,
        clear: bool,
        overrides: &[OverrideMapping],
        options: Option<MapperOptions>,
    ) -> Result<Self> {
        Ok(Self::from_plan(self.plan.adapt(clear, overrides, options)?))
    }

    /// Current bindings in structural order
    pub fn mappings(&self) -> Vec<OverrideMapping> {
        self.plan.mappings()
    }

    /// The underlying plan
    pub fn plan(&self) -> &Arc<MappingPlan<R>> {
        &self.plan
    }
}
