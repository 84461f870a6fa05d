//! Bounded in-memory record queue
//!
//! FIFO with drop-oldest overflow: a new record is always admitted, and
//! when the queue is full the head is evicted to make room. The evicted
//! record is returned to the caller so it can be fallback-logged - the
//! queue itself never does I/O.
//!
//! Enqueue and dequeue are atomic with respect to each other (single
//! mutex), so the ingest path and the flusher task can share the queue
//! freely.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::PipelineError;

/// Bounded FIFO of pending records.
#[derive(Debug)]
pub struct MessageQueue<T> {
    inner: Mutex<VecDeque<T>>,
    max_size: usize,
}

impl<T> MessageQueue<T> {
    /// Create a queue with the given capacity.
    ///
    /// # Errors
    ///
    /// Rejects a capacity of zero.
    pub fn new(max_size: usize) -> Result<Self, PipelineError> {
        if max_size == 0 {
            return Err(PipelineError::QueueCapacity(
                "max_size must be greater than 0".into(),
            ));
        }
        Ok(Self {
            inner: Mutex::new(VecDeque::with_capacity(max_size.min(1024))),
            max_size,
        })
    }

    /// Append a record, evicting the head if the queue is full.
    ///
    /// Returns the evicted record when an eviction happened, `None`
    /// otherwise. The new record is always admitted.
    pub fn enqueue(&self, item: T) -> Option<T> {
        let mut inner = self.inner.lock();
        let dropped = if inner.len() == self.max_size {
            inner.pop_front()
        } else {
            None
        };
        inner.push_back(item);
        dropped
    }

    /// Remove and return the head.
    pub fn dequeue(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Remove and return up to `n` head elements in FIFO order.
    ///
    /// Returns fewer when the queue is shorter; `n == 0` yields an empty
    /// vector.
    pub fn dequeue_batch(&self, n: usize) -> Vec<T> {
        if n == 0 {
            return Vec::new();
        }
        let mut inner = self.inner.lock();
        let count = n.min(inner.len());
        inner.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().len() == self.max_size
    }

    /// Discard all queued records.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
