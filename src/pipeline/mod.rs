//! Batch pipeline: queue independent operations, then run them together.
//!
//! ```rust,ignore
//! let mut pipeline = db.pipeline();
//! pipeline.enqueue(|| db.select(Filter::attributes(a), None));
//! pipeline.enqueue(|| db.select(Filter::attributes(b), None));
//! let results = pipeline.drain().await?; // [first, second], in order
//! ```
//!
//! Entries run concurrently inside the calling task and carry no dependency
//! graph: an entry must never need the result of another entry of the same
//! batch.

use std::fmt;
use std::future::Future;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use tracing::debug;

use crate::error::{HarperError, Result};

/// A queue of deferred operations resolved together by [`Pipeline::drain`].
///
/// Each entry is bound when it is enqueued (the closure runs immediately
/// and produces a future) but nothing is sent until the pipeline is drained.
pub struct Pipeline<'a, T> {
    queue: Option<Vec<BoxFuture<'a, Result<T>>>>,
}

impl<'a, T: Send + 'a> Pipeline<'a, T> {
    /// Creates an empty pipeline. The queue itself is allocated on first use.
    pub fn new() -> Self {
        Self { queue: None }
    }

    /// Queues one operation.
    ///
    /// `operation` is invoked right away to bind its arguments; the future
    /// it returns is only polled by `drain`.
    pub fn enqueue<F, Fut>(&mut self, operation: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.queue
            .get_or_insert_with(Vec::new)
            .push(operation().boxed());
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.queue.as_ref().map_or(0, Vec::len)
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every queued operation concurrently and clears the queue.
    ///
    /// Waits for all entries, even when one fails. Results come back in
    /// submission order; on failure the first error in submission order is
    /// returned.
    ///
    /// # Errors
    /// Returns [`HarperError::EmptyBatch`] if nothing was queued.
    pub async fn drain(&mut self) -> Result<Vec<T>> {
        if self.is_empty() {
            return Err(HarperError::EmptyBatch);
        }
        self.drain_or_empty().await
    }

    /// Like [`drain`](Self::drain), but an empty queue yields an empty list.
    pub async fn drain_or_empty(&mut self) -> Result<Vec<T>> {
        let queue = self.queue.take().unwrap_or_default();
        if queue.is_empty() {
            return Ok(Vec::new());
        }

        debug!(entries = queue.len(), "Draining pipeline");
        join_all(queue).await.into_iter().collect()
    }
}

impl<'a, T: Send + 'a> Default for Pipeline<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Pipeline<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("queued", &self.queue.as_ref().map_or(0, Vec::len))
            .finish()
    }
}
