//! Typed record reading
//!
//! A [`ReaderContext`] drives a [`MappingPlan`] against records pulled from a
//! [`RawReader`]. Contexts hold per-session state (header lookup, error
//! handler, exhaustion) and are never shared across sessions.

use std::collections::HashMap;
use std::sync::Arc;

use csvmap_codec::MappingPlan;
use csvmap_format::{BoxError, CsvMapError, Result, SetterInput};

use crate::raw::RawReader;

/// Decides what happens to an error raised during [`ReaderContext::read_all`]
/// or [`ReaderContext::iterate`].
///
/// Returning `Ok(())` absorbs the error and reading continues; returning an
/// error stops reading with that error.
pub trait ErrorHandler {
    /// Handle `error`, raised for the record starting on `line`
    fn handle(&mut self, error: CsvMapError, line: usize) -> Result<()>;
}

impl<F> ErrorHandler for F
where
    F: FnMut(CsvMapError, usize) -> Result<()>,
{
    fn handle(&mut self, error: CsvMapError, line: usize) -> Result<()> {
        self(error, line)
    }
}

/// Hook run on every successfully mapped record
pub type PostProcessor<R> = Box<dyn FnMut(&mut R) -> std::result::Result<(), BoxError>>;

enum Headers {
    Pending,
    Resolved(HashMap<String, usize>),
    Missing,
}

impl Headers {
    fn from_names(names: &[String]) -> Self {
        let mut lookup = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            lookup.insert(name.clone(), index);
        }
        Headers::Resolved(lookup)
    }
}

/// A read session mapping raw records onto `R`
pub struct ReaderContext<R, S> {
    source: S,
    plan: Arc<MappingPlan<R>>,
    post_processor: Option<PostProcessor<R>>,
    error_handler: Option<Box<dyn ErrorHandler>>,
    headers: Headers,
    exhausted: bool,
}

impl<R: Default, S: RawReader> ReaderContext<R, S> {
    /// New session over `source` using `plan`
    pub fn new(source: S, plan: Arc<MappingPlan<R>>) -> Self {
        Self {
            source,
            plan,
            post_processor: None,
            error_handler: None,
            headers: Headers::Pending,
            exhausted: false,
        }
    }

    /// Run `post_processor` on every record after its fields are set
    pub fn with_post_processor<F>(mut self, post_processor: F) -> Self
    where
        F: FnMut(&mut R) -> std::result::Result<(), BoxError> + 'static,
    {
        self.post_processor = Some(Box::new(post_processor));
        self
    }

    /// Route errors raised by `read_all` and `iterate` through `handler`
    pub fn with_error_handler<H: ErrorHandler + 'static>(mut self, handler: H) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Use `headers` for named bindings instead of the source's header row
    pub fn supply_headers<I, T>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let names: Vec<String> = headers.into_iter().map(Into::into).collect();
        tracing::trace!(columns = names.len(), "using supplied headers");
        self.headers = Headers::from_names(&names);
        self
    }

    /// The plan this session reads with
    pub fn plan(&self) -> &MappingPlan<R> {
        &self.plan
    }

    /// The underlying record source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Line on which the last attempted record started
    pub fn line(&self) -> usize {
        self.source.line()
    }

    /// Read the next record, `Ok(None)` once the input is exhausted.
    ///
    /// Errors are returned as raised, without line annotation and without
    /// consulting the error handler.
    pub fn read(&mut self) -> Result<Option<R>> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(record) = self.source.read_record()? else {
            self.exhausted = true;
            return Ok(None);
        };

        let mut row = R::default();
        let specials = self.plan.specials();
        if let Some(set_line) = &specials.line {
            set_line(&mut row, self.source.line());
        }
        if let Some(set_record) = &specials.record {
            set_record(&mut row, &record);
        }
        if let Some(set_raw_line) = &specials.raw_line {
            set_raw_line(&mut row, self.source.raw_record());
        }

        let options = self.plan.options();
        for (i, value) in record.iter().enumerate() {
            if let Some(set) = self.plan.column(i + 1) {
                set(
                    &mut row,
                    &SetterInput {
                        value,
                        quoted: self.source.field_quoted(i),
                        empty_as_zero: options.default_empty_values,
                        record: &record,
                    },
                )?;
            }
        }

        if self.plan.has_named() {
            self.resolve_headers();
            let Headers::Resolved(lookup) = &self.headers else {
                return Err(CsvMapError::HeadersNotPresent);
            };
            for (name, set) in self.plan.named() {
                let index = match lookup.get(name) {
                    Some(&index) if index < record.len() => index,
                    _ if options.ignore_unknown_field_names => continue,
                    Some(&index) => {
                        return Err(CsvMapError::FieldOutOfRange {
                            index: index + 1,
                            len: record.len(),
                        })
                    }
                    None => return Err(CsvMapError::HeaderNotPresent(name.to_string())),
                };
                set(
                    &mut row,
                    &SetterInput {
                        value: &record[index],
                        quoted: self.source.field_quoted(index),
                        empty_as_zero: options.default_empty_values,
                        record: &record,
                    },
                )?;
            }
        }

        if let Some(post_processor) = self.post_processor.as_mut() {
            post_processor(&mut row).map_err(CsvMapError::Custom)?;
        }
        Ok(Some(row))
    }

    /// Read every remaining record.
    ///
    /// Without an error handler the first error stops reading and is returned
    /// annotated with its line. With one, absorbed errors simply leave the
    /// failing records out of the result.
    pub fn read_all(&mut self) -> Result<Vec<R>> {
        let mut rows = Vec::new();
        loop {
            match self.read() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => return Ok(rows),
                Err(err) => self.handle_error(err)?,
            }
        }
    }

    /// Feed records to `callback` until it returns `Ok(false)`, an error
    /// stops iteration, or the input is exhausted.
    ///
    /// Read errors and callback errors both pass through the error handler.
    pub fn iterate<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(R) -> std::result::Result<bool, BoxError>,
    {
        loop {
            let row = match self.read() {
                Ok(Some(row)) => row,
                Ok(None) => return Ok(()),
                Err(err) => {
                    self.handle_error(err)?;
                    continue;
                }
            };
            match callback(row) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => self.handle_error(CsvMapError::Custom(err))?,
            }
        }
    }

    fn handle_error(&mut self, error: CsvMapError) -> Result<()> {
        let line = self.source.line();
        match self.error_handler.as_mut() {
            Some(handler) => {
                let message = error.to_string();
                handler.handle(error, line)?;
                tracing::debug!(line, error = %message, "error handler absorbed read error");
                Ok(())
            }
            None => Err(error.at_line(line)),
        }
    }

    fn resolve_headers(&mut self) {
        if !matches!(self.headers, Headers::Pending) {
            return;
        }
        self.headers = match self.source.header() {
            Some(names) => {
                tracing::trace!(columns = names.len(), "resolved headers from source");
                Headers::from_names(names)
            }
            None => Headers::Missing,
        };
    }
}

impl<R: Default, S: RawReader> Iterator for ReaderContext<R, S> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
