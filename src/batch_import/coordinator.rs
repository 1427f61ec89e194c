//! Submits imported transactions to the scoring API one chunk at a time.

use std::slice::Chunks;

use crate::{
    Error,
    api::{BatchResult, TransactionApi},
    transaction::NewTransaction,
};

/// The number of transactions submitted per batch request unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// The running tally of a batch import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// The number of transactions in the import.
    pub total: usize,
    /// The number of transactions submitted so far.
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub fraudulent: usize,
}

impl BatchProgress {
    /// An empty tally for an import of `total` transactions.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Add the result of a chunk of `chunk_len` transactions.
    pub fn record(&mut self, chunk_len: usize, result: &BatchResult) {
        self.processed += chunk_len;
        self.successful += result.successful;
        self.failed += result.failed;
        self.fraudulent += result.fraudulent;
    }

    /// How much of the import has been submitted, rounded to the nearest percent.
    pub fn percent_complete(&self) -> usize {
        if self.total == 0 {
            return 100;
        }

        (self.processed * 100 + self.total / 2) / self.total
    }
}

/// A batch import that stopped early.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Failed to process transactions: {error}")]
pub struct BatchImportError {
    /// What stopped the import.
    pub error: Error,
    /// The tally of the chunks that were submitted before the error.
    pub progress: BatchProgress,
}

/// Split `items` into consecutive chunks of `size`, the last chunk may be smaller.
///
/// # Errors
/// Returns [Error::InvalidChunkSize] if `size` is zero.
pub fn chunk<T>(items: &[T], size: usize) -> Result<Chunks<'_, T>, Error> {
    if size == 0 {
        return Err(Error::InvalidChunkSize);
    }

    Ok(items.chunks(size))
}

/// Submit `transactions` in chunks of `batch_size`, waiting for each chunk to
/// be scored before sending the next.
///
/// `on_progress` is called with the updated tally after every chunk.
///
/// # Errors
/// The first failed chunk stops the import. The returned error carries the
/// tally of the chunks submitted before it.
pub async fn run_batch_import(
    api: &dyn TransactionApi,
    transactions: &[NewTransaction],
    batch_size: usize,
    mut on_progress: impl FnMut(&BatchProgress) + Send,
) -> Result<BatchProgress, BatchImportError> {
    let mut progress = BatchProgress::new(transactions.len());

    let chunks =
        chunk(transactions, batch_size).map_err(|error| BatchImportError { error, progress })?;

    for (index, batch) in chunks.enumerate() {
        let result = api
            .submit_batch(batch)
            .await
            .inspect_err(|error| tracing::error!("Batch {index} failed: {error}"))
            .map_err(|error| BatchImportError { error, progress })?;

        progress.record(batch.len(), &result);
        on_progress(&progress);
    }

    Ok(progress)
}
