// Analyzer module: the generative-AI analysis client.

pub mod gemini;
pub mod types;

use crate::model::{AnalysisError, RawResponse};

pub use gemini::GeminiClient;

/// Sends a prompt to a text-generation backend and returns its raw answer.
#[async_trait::async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, prompt: &str, api_key: &str) -> Result<RawResponse, AnalysisError>;
}
