use crate::analyzer::Analyzer;
use crate::analyzer::types::{GeminiError, GenerateContentRequest, GenerateContentResponse};
use crate::config::GeminiConfig;
use crate::model::{AnalysisError, RawResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Analysis client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_base_url: String,
    primary_model: String,
    fallback_model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AnalysisError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            primary_model: config.primary_model.clone(),
            fallback_model: config.fallback_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base_url, model)
    }

    async fn send(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::Response, reqwest::Error> {
        debug!("POST generateContent model={}", model);
        self.client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
    }

    async fn read_text(response: reqwest::Response) -> Result<String, AnalysisError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = upstream_message(&body);
            warn!("❌ Analysis API responded [{}]: {}", status, message);
            return Err(AnalysisError::UpstreamApi {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AnalysisError::MalformedUpstreamResponse(e.to_string()))?;
        match parsed.first_text() {
            Some(text) => Ok(text.to_string()),
            None => Err(AnalysisError::MalformedUpstreamResponse(format!(
                "missing candidates[0].content.parts[0].text (finishReason: {})",
                parsed.finish_reason().unwrap_or("none")
            ))),
        }
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze(&self, prompt: &str, api_key: &str) -> Result<RawResponse, AnalysisError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AnalysisError::InvalidCredentials);
        }
        debug!("API key length: {}, prompt length: {}", api_key.len(), prompt.len());

        let request = GenerateContentRequest::for_prompt(prompt);
        let (model, response) = match self.send(&self.primary_model, api_key, &request).await {
            Ok(resp) => (self.primary_model.clone(), resp),
            Err(e) => {
                warn!(
                    "⏳ Request to {} failed ({}), trying fallback model {}",
                    self.primary_model, e, self.fallback_model
                );
                let resp = self
                    .send(&self.fallback_model, api_key, &request)
                    .await
                    .map_err(|e| AnalysisError::Transport(e.to_string()))?;
                (self.fallback_model.clone(), resp)
            }
        };

        let text = Self::read_text(response).await?;
        info!("✅ Analysis received from {} ({} chars)", model, text.len());
        Ok(RawResponse { text, model })
    }
}

/// Message from the `{"error": {"message": ..}}` envelope, or the raw body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<GeminiError>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRIMARY_PATH: &str = "/v1beta/models/gemini-2.5-pro:generateContent";
    const FALLBACK_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn test_client(server: &MockServer, timeout_secs: u64) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_base_url: format!("{}/v1beta", server.uri()),
            request_timeout_seconds: timeout_secs,
            ..GeminiConfig::default()
        })
        .expect("failed to build test GeminiClient")
    }

    fn candidate_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{\"rating\": 4}")))
            .expect(1)
            .mount(&server)
            .await;

        let raw = test_client(&server, 5)
            .analyze("prompt", "test-key")
            .await
            .expect("analysis should succeed");

        assert_eq!(raw.text, "{\"rating\": 4}");
        assert_eq!(raw.model, "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn sends_schema_constrained_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{}")))
            .mount(&server)
            .await;

        test_client(&server, 5).analyze("the prompt", "k").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "the prompt");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn missing_key_fails_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{}")))
            .expect(0)
            .mount(&server)
            .await;

        let err = test_client(&server, 5).analyze("prompt", "  ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidCredentials), "got: {err:?}");
    }

    #[tokio::test]
    async fn upstream_error_uses_envelope_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FALLBACK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("{}")))
            .expect(0)
            .mount(&server)
            .await;

        let err = test_client(&server, 5).analyze("prompt", "bad").await.unwrap_err();
        match err {
            AnalysisError::UpstreamApi { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("expected UpstreamApi, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_error_without_envelope_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = test_client(&server, 5).analyze("prompt", "k").await.unwrap_err();
        assert!(
            matches!(&err, AnalysisError::UpstreamApi { status: 503, message } if message == "overloaded"),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn success_without_candidates_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = test_client(&server, 5).analyze("prompt", "k").await.unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedUpstreamResponse(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn blocked_candidate_reports_finish_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "candidates": [{ "finishReason": "SAFETY" }] })),
            )
            .mount(&server)
            .await;

        let err = test_client(&server, 5).analyze("prompt", "k").await.unwrap_err();
        assert!(
            matches!(&err, AnalysisError::MalformedUpstreamResponse(msg) if msg.contains("SAFETY")),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn transport_failure_retries_fallback_once_with_same_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body("too late"))
                    .set_delay(Duration::from_secs(5)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FALLBACK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("from fallback")))
            .expect(1)
            .mount(&server)
            .await;

        let raw = test_client(&server, 1)
            .analyze("same prompt", "k")
            .await
            .expect("fallback should answer");

        assert_eq!(raw.text, "from fallback");
        assert_eq!(raw.model, "gemini-2.5-flash");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.path(), PRIMARY_PATH);
        assert_eq!(requests[1].url.path(), FALLBACK_PATH);
        let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn transport_failure_then_fallback_error_is_upstream_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRIMARY_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body("too late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(FALLBACK_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": { "message": "quota" } })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server, 1).analyze("prompt", "k").await.unwrap_err();
        assert!(
            matches!(&err, AnalysisError::UpstreamApi { status: 429, message } if message == "quota"),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn fallback_transport_failure_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(candidate_body("too late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let err = test_client(&server, 1).analyze("prompt", "k").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Transport(_)), "got: {err:?}");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url.path(), PRIMARY_PATH);
        assert_eq!(requests[1].url.path(), FALLBACK_PATH);
    }

    #[test]
    fn upstream_message_fallbacks() {
        assert_eq!(upstream_message(r#"{"error": {"message": "quota"}}"#), "quota");
        assert_eq!(upstream_message(r#"{"error": {}}"#), r#"{"error": {}}"#);
        assert_eq!(upstream_message(""), "Unknown error");
    }
}
