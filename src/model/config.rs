use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const ENV_CONFIG_PATH: &str = "AUTHENTICITY_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_MAX_IN_FLIGHT: &str = "ANALYSIS_MAX_IN_FLIGHT";
const ENV_ITEM_TIMEOUT_SECS: &str = "ANALYSIS_ITEM_TIMEOUT_SECS";
const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Output format the model is asked to follow; the parser reads these labels
const DEFAULT_INSTRUCTIONS: &str = "Assess whether the content below is authentic, misleading, or fabricated. \
Answer with labeled lines: AUTHENTICITY SCORE (0-100, higher is more authentic), \
CLASSIFICATION (Authentic, Likely Authentic, Uncertain, Likely Fake, Fake), CONFIDENCE LEVEL, \
CROSS_MODAL_CONSISTENCY (only when both text and image are given), then bulleted \
SUPPORTING_EVIDENCE and RED_FLAGS_DETECTED, a REASONING_CHAIN, and a RECOMMENDATION.";

/// Batch and per-item execution limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum concurrent analysis client calls in one batch
    pub max_in_flight: usize,
    /// Per-item deadline in seconds
    pub item_timeout_secs: u64,
    /// Largest batch accepted by the API
    pub max_batch_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            item_timeout_secs: 60,
            max_batch_size: 50,
        }
    }
}

impl AnalysisConfig {
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }
}

/// Hosted model settings (the API key is injected separately)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: Url,
    pub model: String,
    pub instructions: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_GEMINI_BASE_URL).expect("default base URL is valid"),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            temperature: 0.05,
            max_output_tokens: 2500,
            top_p: 0.8,
            top_k: 40,
            request_timeout_secs: 90,
        }
    }
}

impl GeminiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub gemini: GeminiConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            gemini: GeminiConfig::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        // Load config file
        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        let mut config = Self {
            analysis: file.analysis,
            gemini: file.gemini,
            port,
            host,
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply env-style overrides from `lookup`; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_MAX_IN_FLIGHT) {
            match value.parse() {
                Ok(n) => self.analysis.max_in_flight = n,
                Err(_) => {
                    tracing::warn!(key = ENV_MAX_IN_FLIGHT, value = %value, "Ignoring invalid override")
                }
            }
        }

        if let Some(value) = lookup(ENV_ITEM_TIMEOUT_SECS) {
            match value.parse() {
                Ok(secs) => self.analysis.item_timeout_secs = secs,
                Err(_) => {
                    tracing::warn!(key = ENV_ITEM_TIMEOUT_SECS, value = %value, "Ignoring invalid override")
                }
            }
        }

        if let Some(model) = lookup(ENV_GEMINI_MODEL).filter(|m| !m.trim().is_empty()) {
            self.gemini.model = model;
        }

        if self.analysis.max_in_flight == 0 {
            tracing::warn!("max_in_flight of 0 is not allowed, using 1");
            self.analysis.max_in_flight = 1;
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Handle empty file
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
