//! Raw record source abstraction

use csvmap_format::Result;

/// A source of tokenized delimited-text records.
///
/// Implemented by [`CsvTokenizer`](crate::tokenizer::CsvTokenizer); reader
/// contexts accept any implementation.
pub trait RawReader {
    /// Next record, or `Ok(None)` at end of input
    fn read_record(&mut self) -> Result<Option<Vec<String>>>;

    /// Header row detected by the source, if it has one
    fn header(&self) -> Option<&[String]>;

    /// 1-based line on which the last attempted record started
    fn line(&self) -> usize;

    /// Whether field `index` (0-based) of the last record was quoted
    fn field_quoted(&self, index: usize) -> bool;

    /// Exact bytes consumed for the last record
    fn raw_record(&self) -> &[u8];
}

impl<T: RawReader + ?Sized> RawReader for Box<T> {
    fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        (**self).read_record()
    }

    fn header(&self) -> Option<&[String]> {
        (**self).header()
    }

    fn line(&self) -> usize {
        (**self).line()
    }

    fn field_quoted(&self, index: usize) -> bool {
        (**self).field_quoted(index)
    }

    fn raw_record(&self) -> &[u8] {
        (**self).raw_record()
    }
}
