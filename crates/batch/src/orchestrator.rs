//! Order-preserving batch summarization

use bookdigest_common::SummaryConfig;
use futures::{stream, FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::strategy::Summarize;
use crate::types::{Admission, BatchRow, SummaryResult};

/// Applies one summarization strategy to every row of a batch
///
/// Output always has the same length and order as the input. A failing row
/// never stops the batch.
pub struct BatchOrchestrator {
    summarizer: Arc<dyn Summarize>,
    config: SummaryConfig,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(summarizer: Arc<dyn Summarize>, config: SummaryConfig) -> Self {
        Self {
            summarizer,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the batch; rows not yet started become `Skipped`
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Summarize every document, returning results in input order
    pub async fn run(&self, documents: Vec<Option<String>>) -> Vec<SummaryResult> {
        self.run_rows(documents)
            .await
            .into_iter()
            .map(|row| row.result)
            .collect()
    }

    /// Summarize every document, keeping each input next to its result
    pub async fn run_rows(&self, documents: Vec<Option<String>>) -> Vec<BatchRow> {
        self.run_with_progress(documents, |_| {}).await
    }

    /// Like [`run_rows`](Self::run_rows), calling `on_row` as each row completes
    ///
    /// With `concurrency > 1` rows may complete out of order; the returned
    /// rows are still in input order.
    pub async fn run_with_progress<F>(&self, documents: Vec<Option<String>>, on_row: F) -> Vec<BatchRow>
    where
        F: Fn(&BatchRow) + Send + Sync,
    {
        let total = documents.len();
        let concurrency = self.config.concurrency.max(1);
        info!(
            "Starting batch - Rows: {}, Strategy: {}, Concurrency: {}",
            total,
            self.summarizer.name(),
            concurrency
        );

        let on_row = &on_row;
        let rows: Vec<BatchRow> = stream::iter(documents.into_iter().enumerate())
            .map(|(index, document)| async move {
                let result = self.process(index, document.as_deref()).await;
                let row = BatchRow {
                    index,
                    document,
                    result,
                };
                on_row(&row);
                row
            })
            .buffered(concurrency)
            .collect()
            .await;

        let summarized = rows.iter().filter(|r| r.result.is_summary()).count();
        let failed = rows
            .iter()
            .filter(|r| r.result == SummaryResult::Failed)
            .count();
        info!(
            "Batch finished - Summarized: {}, Failed: {}, Skipped: {}",
            summarized,
            failed,
            total - summarized - failed
        );

        rows
    }

    /// Summarize one row, converting every failure into a result
    async fn process(&self, index: usize, document: Option<&str>) -> SummaryResult {
        if self.cancel.is_cancelled() {
            debug!("Row {} skipped: batch cancelled", index);
            return SummaryResult::Skipped;
        }

        let text = match Admission::check(document, self.config.admission_threshold) {
            Admission::Missing => {
                debug!("Row {} skipped: missing", index);
                return SummaryResult::Skipped;
            }
            Admission::TooShort { words } => {
                debug!("Row {} skipped: {} word(s)", index, words);
                return SummaryResult::Skipped;
            }
            Admission::Admitted { .. } => document.unwrap_or_default(),
        };

        let attempt = AssertUnwindSafe(self.summarizer.summarize(text, &self.config)).catch_unwind();

        match attempt.await {
            Ok(Ok(output)) => {
                let result = SummaryResult::from_output(output);
                if result == SummaryResult::Failed {
                    warn!("Row {} failed: summarizer gave no usable output", index);
                }
                result
            }
            Ok(Err(e)) => {
                warn!("Row {} failed: {}", index, e);
                SummaryResult::Failed
            }
            Err(_) => {
                warn!("Row {} failed: summarizer panicked", index);
                SummaryResult::Failed
            }
        }
    }
}
