//! Batch orchestration with bounded parallelism
//!
//! Each request is dispatched on its own, at most `max_in_flight` at a time,
//! under a per-item deadline. A failing, panicking, or slow item becomes an
//! [`AnalysisError`] in its own slot; siblings are unaffected and the output
//! is always index-aligned with the input.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt, stream};

use crate::model::{AnalysisConfig, AnalysisRequest, AnalysisResult, RawModelResponse};
use crate::service::analysis::interpret;
use crate::service::error::{AnalysisError, AnalysisFailure};

/// In-flight bound used when none is configured
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Per-item deadline used when none is configured
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(60);

/// The batch was abandoned before every item finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Batch analysis cancelled")]
pub struct BatchCancelled;

/// One request paired with its outcome, tagged with its input position
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub index: usize,
    pub request: AnalysisRequest,
    pub outcome: Result<AnalysisResult, AnalysisError>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_outcome(self) -> Result<AnalysisResult, AnalysisError> {
        self.outcome
    }
}

/// Call the analysis function once, converting panics and deadline overruns into failures
pub(crate) async fn call_analysis<F, Fut>(
    analyze_fn: &F,
    request: &AnalysisRequest,
    item_timeout: Duration,
) -> Result<RawModelResponse, AnalysisFailure>
where
    F: Fn(AnalysisRequest) -> Fut,
    Fut: Future<Output = Result<RawModelResponse, AnalysisFailure>>,
{
    let call = AssertUnwindSafe(async { analyze_fn(request.clone()).await }).catch_unwind();

    match tokio::time::timeout(item_timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(AnalysisFailure::TransportFailure(
            "analysis client panicked".to_string(),
        )),
        Err(_) => Err(AnalysisFailure::Timeout(item_timeout)),
    }
}

/// Fans out analysis requests and collects index-aligned outcomes
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    max_in_flight: usize,
    item_timeout: Duration,
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT, DEFAULT_ITEM_TIMEOUT)
    }
}

impl BatchOrchestrator {
    /// Create an orchestrator; an in-flight bound of 0 is raised to 1
    pub fn new(max_in_flight: usize, item_timeout: Duration) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
            item_timeout,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.max_in_flight, config.item_timeout())
    }

    /// Same timeout, different in-flight bound
    pub fn with_max_in_flight(&self, max_in_flight: usize) -> Self {
        Self::new(max_in_flight, self.item_timeout)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn item_timeout(&self) -> Duration {
        self.item_timeout
    }

    /// Analyze every request, returning one item per request in input order
    ///
    /// Dropping the returned future abandons the batch: in-flight calls are
    /// dropped with it and nothing partial is surfaced.
    pub async fn run<F, Fut>(&self, requests: Vec<AnalysisRequest>, analyze_fn: F) -> Vec<BatchItem>
    where
        F: Fn(AnalysisRequest) -> Fut,
        Fut: Future<Output = Result<RawModelResponse, AnalysisFailure>>,
    {
        let total = requests.len();
        let start_time = Instant::now();
        let analyze_fn = &analyze_fn;

        tracing::debug!(
            total = total,
            max_in_flight = self.max_in_flight,
            item_timeout_ms = self.item_timeout.as_millis(),
            "Starting batch analysis"
        );

        let mut slots: Vec<Option<BatchItem>> = (0..total).map(|_| None).collect();

        let mut completed = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move {
                let outcome = call_analysis(analyze_fn, &request, self.item_timeout)
                    .await
                    .and_then(|response| interpret(response, request.kind()))
                    .map_err(|failure| {
                        tracing::warn!(
                            index = index,
                            kind = %request.kind(),
                            error = %failure,
                            "Batch item failed"
                        );
                        AnalysisError::from_failure(index, &failure)
                    });

                BatchItem {
                    index,
                    request,
                    outcome,
                }
            })
            .buffer_unordered(self.max_in_flight);

        while let Some(item) = completed.next().await {
            tracing::debug!(index = item.index, ok = item.is_ok(), "Batch item completed");
            let index = item.index;
            slots[index] = Some(item);
        }

        let items: Vec<BatchItem> = slots.into_iter().flatten().collect();
        let failed = items.iter().filter(|item| !item.is_ok()).count();

        tracing::info!(
            total = total,
            succeeded = total - failed,
            failed = failed,
            elapsed_ms = start_time.elapsed().as_millis(),
            "Batch analysis complete"
        );

        items
    }

    /// Like [`run`](Self::run), but gives up as soon as `cancel` resolves
    pub async fn run_until<F, Fut, C>(
        &self,
        requests: Vec<AnalysisRequest>,
        analyze_fn: F,
        cancel: C,
    ) -> Result<Vec<BatchItem>, BatchCancelled>
    where
        F: Fn(AnalysisRequest) -> Fut,
        Fut: Future<Output = Result<RawModelResponse, AnalysisFailure>>,
        C: Future<Output = ()>,
    {
        let total = requests.len();
        tokio::select! {
            items = self.run(requests, analyze_fn) => Ok(items),
            () = cancel => {
                tracing::warn!(total = total, "Batch analysis cancelled, discarding in-flight results");
                Err(BatchCancelled)
            }
        }
    }
}
