//! Fixed-size batching of validated records

use crate::record::ClientRecord;

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// A non-empty group of records written in one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// 1-based position of this batch within the run
    pub seq: u64,
    pub records: Vec<ClientRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Collects records and emits a [`Batch`] every `batch_size` records.
///
/// A full batch is handed out as soon as it fills; [`finish`](Self::finish)
/// returns the final partial batch, if any. Emitted batches are never empty.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    pending: Vec<ClientRecord>,
    emitted: u64,
}

impl BatchAccumulator {
    /// `batch_size` of zero is treated as one
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            pending: Vec::with_capacity(batch_size),
            emitted: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Records waiting for the current batch to fill
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Add a record, returning a full batch once `batch_size` is reached
    pub fn push(&mut self, record: ClientRecord) -> Option<Batch> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            Some(self.take())
        } else {
            None
        }
    }

    /// Final partial batch
    pub fn finish(mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Batch {
        self.emitted += 1;
        let records = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        Batch {
            seq: self.emitted,
            records,
        }
    }
}
