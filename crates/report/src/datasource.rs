//! Data sources handed to the engine

use template::{DataSource, EmptyDataSource, Record, RecordDataSource};

/// Records ready for filling
///
/// A handle can be opened more than once; every [`open`](Self::open) returns
/// a fresh cursor positioned at the first record.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceHandle {
    /// Zero rows; every non-detail band still prints
    Empty,
    Records(Vec<Record>),
}

impl DataSourceHandle {
    pub fn open(&self) -> Box<dyn DataSource> {
        match self {
            DataSourceHandle::Empty => Box::new(EmptyDataSource),
            DataSourceHandle::Records(records) => Box::new(RecordDataSource::new(records.clone())),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DataSourceHandle::Empty => 0,
            DataSourceHandle::Records(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DataSourceBuilder;

impl DataSourceBuilder {
    /// Wrap coerced records; no records yields [`DataSourceHandle::Empty`]
    pub fn build(records: Vec<Record>) -> DataSourceHandle {
        if records.is_empty() {
            DataSourceHandle::Empty
        } else {
            DataSourceHandle::Records(records)
        }
    }
}
