//! Gemini REST client implementation

use async_trait::async_trait;
use gemchat_core::config::ProviderConfig;
use gemchat_core::session::{ChatTurn, Part, Role};
use gemchat_core::utils::truncate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{ChatProvider, ProviderError, ProviderResult};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// generateContent request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [ChatTurn],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// generateContent response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    system_instruction: Option<String>,
    generation_config: Option<GenerationConfig>,
}

impl GeminiClient {
    /// Create a client for `model` against the public endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Self::build_http_client(None),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Create a client from the `provider` configuration section
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "Gemini API key is not set".to_string(),
            ));
        }

        let generation_config =
            if config.temperature.is_some() || config.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: config.temperature,
                    max_output_tokens: config.max_output_tokens,
                })
            } else {
                None
            };

        Ok(Self {
            client: Self::build_http_client(Some(Duration::from_secs(config.timeout_secs))),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_instruction: config.system_instruction.clone(),
            generation_config,
        }
        .with_api_base(config.api_base.clone()))
    }

    /// Point the client at another endpoint, e.g. a proxy
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into();
        let trimmed = api_base.trim().trim_end_matches('/');
        self.api_base = if trimmed.is_empty() {
            DEFAULT_API_BASE.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    fn build_http_client(timeout: Option<Duration>) -> Client {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().unwrap_or_else(|_| Client::new())
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request<'a>(&'a self, contents: &'a [ChatTurn]) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents,
            system_instruction: self
                .system_instruction
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .map(|text| SystemInstruction {
                    parts: [TextPart { text }],
                }),
            generation_config: self.generation_config.clone(),
        }
    }

    /// Turn the first candidate into a model turn
    fn parse_response(response: GenerateContentResponse) -> ProviderResult<ChatTurn> {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(ProviderError::Blocked(format!("prompt blocked ({})", reason)));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in response".to_string()))?;

        let parts: Vec<Part> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text)
            .map(|text| Part { text })
            .collect();

        if parts.is_empty() {
            return Err(match candidate.finish_reason.as_deref() {
                Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                    ProviderError::Blocked(format!("reply withheld ({})", reason))
                }
                Some(reason) => ProviderError::InvalidResponse(format!(
                    "Candidate has no text (finish reason {})",
                    reason
                )),
                None => ProviderError::InvalidResponse("Candidate has no text".to_string()),
            });
        }

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                warn!("Gemini reply finished early: {}", reason);
            }
        }

        Ok(ChatTurn {
            role: Role::Model,
            parts,
        })
    }

    fn parse_error(status: u16, body: &str) -> ProviderError {
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => match (envelope.error.status, envelope.error.message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (None, Some(message)) => message,
                (Some(code), None) => code,
                (None, None) => truncate(body, 300),
            },
            Err(_) => truncate(body, 300),
        };
        ProviderError::ApiError { status, message }
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn generate(&self, contents: &[ChatTurn]) -> ProviderResult<ChatTurn> {
        let request = self.build_request(contents);

        debug!(
            "Sending generateContent request to {} with model {} ({} turn(s))",
            self.api_base,
            self.model,
            contents.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::parse_error(status.as_u16(), &error_text));
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        Self::parse_response(parsed)
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn test_client(server: &mockito::Server) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-test").with_api_base(server.url())
    }

    #[test]
    fn test_with_api_base_trims_slash() {
        let client = GeminiClient::new("k", "m").with_api_base("http://localhost:8080/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/m:generateContent"
        );
        let client = GeminiClient::new("k", "m").with_api_base("  ");
        assert!(client.endpoint().starts_with(DEFAULT_API_BASE));
    }

    #[test]
    fn test_from_config_requires_key() {
        let err = GeminiClient::from_config(&ProviderConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::ConfigError(_)));
    }

    #[test]
    fn test_request_serialization() {
        let mut config = ProviderConfig::default();
        config.api_key = "k".to_string();
        config.temperature = Some(0.5);
        config.system_instruction = Some("Be brief.".to_string());
        let client = GeminiClient::from_config(&config).unwrap();

        let contents = vec![ChatTurn::user("Hi"), ChatTurn::model("Hello"), ChatTurn::user("Bye")];
        let value = serde_json::to_value(client.build_request(&contents)).unwrap();

        assert_eq!(value["contents"][0], json!({"role": "user", "parts": [{"text": "Hi"}]}));
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(value["generationConfig"]["temperature"], 0.5);
        assert!(value["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_parse_response_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "Answer"}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let turn = GeminiClient::parse_response(response).unwrap();
        assert_eq!(turn, ChatTurn::model("Answer"));
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        let err = GeminiClient::parse_response(response).unwrap_err();
        assert!(matches!(err, ProviderError::Blocked(_)));
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        let err = GeminiClient::parse_response(response).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_error_envelope() {
        let err = GeminiClient::parse_error(
            400,
            r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(
            err.to_string(),
            "API error (HTTP 400): INVALID_ARGUMENT: API key not valid."
        );
        assert!(GeminiClient::parse_error(403, "forbidden").is_auth());
    }

    #[tokio::test]
    async fn test_generate_sends_history_and_returns_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hello"}]},
                    {"role": "model", "parts": [{"text": "Hi!"}]},
                    {"role": "user", "parts": [{"text": "How are you?"}]}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Great, thanks."}]},"finishReason":"STOP"}]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let contents = vec![
            ChatTurn::user("Hello"),
            ChatTurn::model("Hi!"),
            ChatTurn::user("How are you?"),
        ];
        let reply = client.generate(&contents).await.unwrap();

        assert_eq!(reply, ChatTurn::model("Great, thanks."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_maps_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let err = test_client(&server)
            .generate(&[ChatTurn::user("Hello")])
            .await
            .unwrap_err();

        match err {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = test_client(&server)
            .generate(&[ChatTurn::user("Hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::JsonError(_)));
    }
}
