//! Record sources consumed by the filler

use crate::value::Record;

/// Forward-only source of records
pub trait DataSource {
    /// Next record, or `None` once the source is exhausted
    fn next_record(&mut self) -> Option<Record>;
}

/// A source with no records
///
/// Filling with an empty source still prints every non-detail band.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDataSource;

impl DataSource for EmptyDataSource {
    fn next_record(&mut self) -> Option<Record> {
        None
    }
}

/// Single-pass cursor over owned records
#[derive(Debug, Clone)]
pub struct RecordDataSource {
    records: std::vec::IntoIter<Record>,
}

impl RecordDataSource {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl DataSource for RecordDataSource {
    fn next_record(&mut self) -> Option<Record> {
        self.records.next()
    }
}
