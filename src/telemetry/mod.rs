// Best-effort trace reporting to a Langfuse-compatible ingestion endpoint.

pub mod trace;

use crate::model::{NormalizedResult, ProductRecord};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use trace::IngestionBatch;

pub const INGESTION_PATH: &str = "/api/public/ingestion";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub secret_key: String,
    pub public_key: String,
    pub host: String,
}

impl TelemetryConfig {
    /// All three credential fields are present.
    pub fn is_complete(&self) -> bool {
        [&self.secret_key, &self.public_key, &self.host]
            .iter()
            .all(|v| !v.trim().is_empty())
    }

    fn ingestion_url(&self) -> String {
        format!("{}{}", self.host.trim().trim_end_matches('/'), INGESTION_PATH)
    }
}

/// Everything one analysis produced, owned so it can move into a detached task.
#[derive(Debug, Clone)]
pub struct TraceInput {
    pub record: ProductRecord,
    pub prompt: String,
    pub raw_response: String,
    pub result: NormalizedResult,
    pub model: String,
}

#[derive(Debug, Error)]
enum TelemetryError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ingestion API error: {status} - {body}")]
    Status { status: u16, body: String },
}

pub struct TelemetryReporter {
    client: Client,
}

impl TelemetryReporter {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to configure telemetry HTTP client ({}), using defaults", e);
                Client::new()
            });
        Self { client }
    }

    /// Posts one trace event. Never fails: incomplete credentials make this a
    /// no-op and delivery errors are only logged.
    pub async fn report(&self, input: &TraceInput, config: &TelemetryConfig) {
        if !config.is_complete() {
            debug!("Telemetry not configured, skipping trace");
            return;
        }
        match self.post(input, config).await {
            Ok(trace_id) => info!("📈 Trace recorded: {}", trace_id),
            Err(e) => warn!("Telemetry tracking failed: {}", e),
        }
    }

    /// Runs [`report`](Self::report) as a detached task.
    pub fn spawn_report(
        reporter: Arc<TelemetryReporter>,
        input: TraceInput,
        config: TelemetryConfig,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            reporter.report(&input, &config).await;
        })
    }

    async fn post(&self, input: &TraceInput, config: &TelemetryConfig) -> Result<String, TelemetryError> {
        let batch = IngestionBatch::single_trace(input);
        let trace_id = batch.trace_id().to_string();

        let response = self
            .client
            .post(config.ingestion_url())
            .basic_auth(config.public_key.trim(), Some(config.secret_key.trim()))
            .json(&batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown".into());
            return Err(TelemetryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(trace_id)
    }
}

impl Default for TelemetryReporter {
    fn default() -> Self {
        Self::new()
    }
}
