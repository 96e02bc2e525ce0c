pub mod analysis;
pub mod batch;
pub mod client;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod risk;

pub use analysis::AnalysisService;
pub use client::{AnalysisClient, GeminiClient};
pub use error::{AnalysisError, AnalysisFailure, ErrorKind, RequestError};
