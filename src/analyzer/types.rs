// Gemini generateContent wire types
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const TEMPERATURE: f32 = 0.7;
pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
    pub response_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// A single user turn carrying `prompt`, with the fixed sampling
    /// parameters and the result schema.
    pub fn for_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiError {
    pub error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

/// JSON schema mirroring `NormalizedResult`'s serialized shape.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "Product name": { "type": "string" },
            "Description": { "type": "string" },
            "pros": { "type": "array", "items": { "type": "string" } },
            "cons": { "type": "array", "items": { "type": "string" } },
            "rating": { "type": "number" },
            "ratingJustification": { "type": "string" },
            "Current price": { "type": "string" },
            "otherWebsitePrices": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "site": { "type": "string" },
                        "price": { "type": "string" }
                    },
                    "required": ["site", "price"]
                }
            },
            "recommendations": { "type": "string" }
        },
        "required": [
            "Product name",
            "Description",
            "pros",
            "cons",
            "rating",
            "ratingJustification",
            "Current price",
            "otherWebsitePrices",
            "recommendations"
        ]
    })
}
