//! Analysis clients: the seam between the core and a hosted model
//!
//! The core never talks to a provider directly. It calls an injected
//! [`AnalysisClient`], which must be safe to share across concurrent batch
//! items.

mod gemini;

use async_trait::async_trait;

use crate::model::{AnalysisRequest, RawModelResponse};
use crate::service::error::AnalysisFailure;

pub use gemini::{GeminiClient, GeminiClientError};

#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Run one model call for `request`
    ///
    /// Provider errors (auth, quota, network) map to `TransportFailure`,
    /// undecodable provider payloads to `InvalidResponse`, and a request
    /// that ran past the client's own deadline to `Timeout`.
    async fn analyze(&self, request: &AnalysisRequest)
    -> Result<RawModelResponse, AnalysisFailure>;

    /// Model identifier reported alongside results
    fn model_name(&self) -> &str;
}
