//! Application state and service initialization
//!
//! Secrets are read here once and injected into the clients that need them;
//! nothing below this layer touches the environment.

use std::sync::Arc;

use crate::model::Config;
use crate::service::client::GeminiClientError;
use crate::service::{AnalysisClient, AnalysisService, GeminiClient};

const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Application state containing all services and shared resources
pub struct AppState {
    pub analysis_service: Arc<AnalysisService>,
}

impl AppState {
    /// Build the Gemini client from `GEMINI_API_KEY` and wire the analysis service
    pub fn new(config: Config) -> Result<Self, AppError> {
        let api_key = std::env::var(ENV_GEMINI_API_KEY)
            .map_err(|_| AppError::MissingConfig(ENV_GEMINI_API_KEY))?;

        let client = GeminiClient::new(api_key, config.gemini.clone())?;
        Ok(Self::with_client(&config, Arc::new(client)))
    }

    /// Wire the analysis service around an already-built client
    pub fn with_client(config: &Config, client: Arc<dyn AnalysisClient>) -> Self {
        Self {
            analysis_service: Arc::new(AnalysisService::new(client, &config.analysis)),
        }
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Analysis client could not be built
    #[error("Invalid analysis client configuration: {0}")]
    Client(#[from] GeminiClientError),
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::{AnalysisRequest, RawModelResponse};
    use crate::service::AnalysisFailure;

    struct NoopClient;

    #[async_trait]
    impl AnalysisClient for NoopClient {
        async fn analyze(
            &self,
            _request: &AnalysisRequest,
        ) -> Result<RawModelResponse, AnalysisFailure> {
            Ok(RawModelResponse::default())
        }

        fn model_name(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn test_with_client_uses_analysis_config() {
        let mut config = Config::default();
        config.analysis.max_in_flight = 7;

        let state = AppState::with_client(&config, Arc::new(NoopClient));
        assert_eq!(state.analysis_service.max_in_flight(), 7);
        assert_eq!(state.analysis_service.model_name(), "noop");
    }
}
