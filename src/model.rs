// Core structs: ProductRecord, NormalizedResult and the error taxonomy
use crate::config::ConfigError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Placeholder used for every field the analysis could not fill.
pub const NOT_AVAILABLE: &str = "N/A";

/// Rating used when none can be recovered from the model output.
pub const DEFAULT_RATING: f64 = 3.0;

/// A product page to scrape: where it came from and its markup.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub source_url: String,
    pub domain: String,
    pub title: String,
    pub price_text: String,
    pub description_text: String,
    pub image_urls: Vec<String>,
    pub brand: String,
    pub rating_value: Option<f64>,
    pub review_texts: Vec<String>,
    pub availability: String,
    pub specifications: BTreeMap<String, String>,
    pub extracted_at: DateTime<Utc>,
}

impl ProductRecord {
    /// An empty record for `source_url`; extraction fills in what it finds.
    pub fn empty(source_url: &str, domain: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            domain: domain.to_string(),
            title: String::new(),
            price_text: String::new(),
            description_text: String::new(),
            image_urls: Vec::new(),
            brand: String::new(),
            rating_value: None,
            review_texts: Vec::new(),
            availability: String::new(),
            specifications: BTreeMap::new(),
            extracted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub site: String,
    pub price: String,
}

/// The fixed nine-field analysis shape. Serializes to the exact keys the
/// model is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    #[serde(rename = "Product name")]
    pub product_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub rating: f64,
    #[serde(rename = "ratingJustification")]
    pub rating_justification: String,
    #[serde(rename = "Current price")]
    pub current_price: String,
    #[serde(rename = "otherWebsitePrices")]
    pub other_website_prices: Vec<PriceQuote>,
    pub recommendations: String,
}

impl Default for NormalizedResult {
    fn default() -> Self {
        Self {
            product_name: NOT_AVAILABLE.to_string(),
            description: NOT_AVAILABLE.to_string(),
            pros: Vec::new(),
            cons: Vec::new(),
            rating: DEFAULT_RATING,
            rating_justification: NOT_AVAILABLE.to_string(),
            current_price: NOT_AVAILABLE.to_string(),
            other_website_prices: Vec::new(),
            recommendations: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Raw model output together with the model identifier that produced it.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub text: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("This tool only works on {supported} product pages (got \"{host}\")")]
    UnsupportedSite { host: String, supported: String },

    #[error("invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("API key is required")]
    InvalidCredentials,

    #[error("API Error ({status}): {message}")]
    UpstreamApi { status: u16, message: String },

    #[error("Invalid response from analysis API: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Analysis request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    InvalidResponse { status: u16, url: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Please enter a valid API key")]
    MissingApiKey,
}

/// Everything that can stop an analysis before a result is shown.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Input(String),
}
