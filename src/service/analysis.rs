//! Analysis service: one request or a batch, end to end
//!
//! Single-item analysis surfaces client failures directly; batch analysis
//! folds them into per-item errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::{AnalysisConfig, AnalysisRequest, AnalysisResult, RawModelResponse, RequestKind};
use crate::service::batch::{BatchCancelled, BatchItem, BatchOrchestrator, call_analysis};
use crate::service::client::AnalysisClient;
use crate::service::error::AnalysisFailure;
use crate::service::extractor::extract;
use crate::service::parser::parse;
use crate::service::risk::annotate;

/// Turn one raw response into a risk-annotated verdict
pub fn interpret(
    response: RawModelResponse,
    kind: RequestKind,
) -> Result<AnalysisResult, AnalysisFailure> {
    let extracted = extract(response)?;
    let parsed = parse(&extracted.text, extracted.citations, kind);
    Ok(annotate(parsed))
}

/// Runs analysis requests against a shared analysis client
pub struct AnalysisService {
    client: Arc<dyn AnalysisClient>,
    orchestrator: BatchOrchestrator,
    max_batch_size: usize,
}

impl AnalysisService {
    pub fn new(client: Arc<dyn AnalysisClient>, config: &AnalysisConfig) -> Self {
        let orchestrator = BatchOrchestrator::from_config(config);

        tracing::info!(
            model = %client.model_name(),
            max_in_flight = orchestrator.max_in_flight(),
            item_timeout_secs = orchestrator.item_timeout().as_secs(),
            "Analysis service initialized"
        );

        Self {
            client,
            orchestrator,
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub fn max_in_flight(&self) -> usize {
        self.orchestrator.max_in_flight()
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn item_timeout(&self) -> Duration {
        self.orchestrator.item_timeout()
    }

    /// Analyze one request; transport, timeout, and response errors are returned as-is
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisFailure> {
        let start_time = Instant::now();
        let kind = request.kind();
        let client = &self.client;

        tracing::debug!(
            kind = %kind,
            model = %client.model_name(),
            use_grounding = request.use_grounding(),
            "Initiating model call for content analysis"
        );

        let analyze_fn = |request: AnalysisRequest| async move { client.analyze(&request).await };
        let outcome = call_analysis(&analyze_fn, &request, self.item_timeout())
            .await
            .and_then(|response| interpret(response, kind));

        let elapsed = start_time.elapsed();
        match &outcome {
            Ok(result) => tracing::info!(
                kind = %kind,
                score = result.score(),
                classification = %result.classification(),
                risk_level = ?result.risk_level,
                citations = result.analysis.citations.len(),
                elapsed_ms = elapsed.as_millis(),
                "Content analysis completed"
            ),
            Err(e) => tracing::error!(
                kind = %kind,
                elapsed_ms = elapsed.as_millis(),
                error = %e,
                "Content analysis failed"
            ),
        }

        outcome
    }

    /// Analyze a batch, optionally with a tighter in-flight bound than configured
    pub async fn analyze_batch(
        &self,
        requests: Vec<AnalysisRequest>,
        max_in_flight: Option<usize>,
    ) -> Vec<BatchItem> {
        let orchestrator = self.orchestrator_for(max_in_flight);
        let client = &self.client;
        orchestrator
            .run(requests, |request: AnalysisRequest| async move {
                client.analyze(&request).await
            })
            .await
    }

    /// Analyze a batch that the caller may abandon by resolving `cancel`
    pub async fn analyze_batch_until<C>(
        &self,
        requests: Vec<AnalysisRequest>,
        max_in_flight: Option<usize>,
        cancel: C,
    ) -> Result<Vec<BatchItem>, BatchCancelled>
    where
        C: Future<Output = ()>,
    {
        let orchestrator = self.orchestrator_for(max_in_flight);
        let client = &self.client;
        orchestrator
            .run_until(
                requests,
                |request: AnalysisRequest| async move { client.analyze(&request).await },
                cancel,
            )
            .await
    }

    /// A caller may lower the configured bound but never raise it
    fn orchestrator_for(&self, max_in_flight: Option<usize>) -> BatchOrchestrator {
        match max_in_flight {
            Some(n) if n < self.orchestrator.max_in_flight() => {
                self.orchestrator.with_max_in_flight(n)
            }
            _ => self.orchestrator.clone(),
        }
    }
}
