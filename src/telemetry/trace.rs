// Ingestion payload for a single product-analysis trace.

use crate::model::NormalizedResult;
use crate::telemetry::TraceInput;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;

const TRACE_NAME: &str = "product-analysis";
const EVENT_TYPE: &str = "trace-create";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Serialize)]
pub struct IngestionBatch {
    pub batch: Vec<IngestionEvent>,
}

#[derive(Debug, Serialize)]
pub struct IngestionEvent {
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub body: TraceBody,
}

#[derive(Debug, Serialize)]
pub struct TraceBody {
    pub id: String,
    pub name: &'static str,
    pub input: TraceInputBlock,
    pub output: TraceOutputBlock,
    pub metadata: TraceMetadata,
}

#[derive(Debug, Serialize)]
pub struct TraceInputBlock {
    pub product_title: String,
    pub product_price: String,
    pub product_brand: String,
    pub product_rating: Option<f64>,
    pub product_url: String,
    pub product_domain: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct TraceOutputBlock {
    pub raw_response: String,
    pub parsed_result: NormalizedResult,
}

#[derive(Debug, Serialize)]
pub struct TraceMetadata {
    pub model: String,
    pub client_version: &'static str,
    pub timestamp: String,
}

impl IngestionBatch {
    /// One-element batch holding a `trace-create` event for `input`.
    pub fn single_trace(input: &TraceInput) -> Self {
        let now = Utc::now();
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = &input.record;

        let event = IngestionEvent {
            id: unique_id("event", now.timestamp_millis()),
            timestamp: timestamp.clone(),
            kind: EVENT_TYPE,
            body: TraceBody {
                id: unique_id("trace", now.timestamp_millis()),
                name: TRACE_NAME,
                input: TraceInputBlock {
                    product_title: record.title.clone(),
                    product_price: record.price_text.clone(),
                    product_brand: record.brand.clone(),
                    product_rating: record.rating_value,
                    product_url: record.source_url.clone(),
                    product_domain: record.domain.clone(),
                    prompt: input.prompt.clone(),
                },
                output: TraceOutputBlock {
                    raw_response: input.raw_response.clone(),
                    parsed_result: input.result.clone(),
                },
                metadata: TraceMetadata {
                    model: input.model.clone(),
                    client_version: env!("CARGO_PKG_VERSION"),
                    timestamp,
                },
            },
        };
        Self { batch: vec![event] }
    }

    pub fn trace_id(&self) -> &str {
        self.batch.first().map(|e| e.body.id.as_str()).unwrap_or_default()
    }
}

/// `<prefix>_<millis>_<random>`. Unique enough for tracing, not for security.
fn unique_id(prefix: &str, millis: i64) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{prefix}_{millis}_{suffix}")
}
