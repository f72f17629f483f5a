//! FIFO connector between one producing step and one consuming step.

use std::collections::VecDeque;

use stepflow_types::{NoRecordsAvailable, Record};

/// Opaque handle to a [`Connector`] owned by a job's
/// [`ConnectorArena`](crate::multicast::ConnectorArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectorId(pub(crate) usize);

/// Unbounded in-memory FIFO queue of records.
#[derive(Debug, Default)]
pub struct Connector {
    queue: VecDeque<Record>,
}

impl Connector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records waiting to be dequeued.
    #[must_use]
    pub fn count(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn has_available(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn enqueue(&mut self, record: Record) {
        tracing::trace!(record = %record, "Enqueue");
        self.queue.push_back(record);
    }

    pub fn enqueue_all(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.enqueue(record);
        }
    }

    /// Remove and return the oldest record.
    ///
    /// # Errors
    ///
    /// Returns [`NoRecordsAvailable`] when the queue is empty. Callers are
    /// expected to check [`Connector::has_available`] first.
    pub fn dequeue(&mut self) -> Result<Record, NoRecordsAvailable> {
        let record = self.queue.pop_front().ok_or(NoRecordsAvailable)?;
        tracing::trace!(record = %record, "Dequeue");
        Ok(record)
    }
}
