//! OpenAI-compatible chat-completions client (OpenRouter by default).
//!
//! Every call asks for a JSON object response; [`AiClient::complete_json`]
//! returns the parsed `serde_json::Value` so callers can pick out only the
//! keys the model actually produced.

use std::time::Duration;

use dealscout_shared::{AiConfig, DealScoutError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Request timeout for model inference.
const AI_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct AiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: Client,
}

impl AiClient {
    pub fn new(api_key: &str, config: &AiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(AI_TIMEOUT)
            .build()
            .map_err(|e| DealScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            http,
        })
    }

    /// Send a single-turn prompt and parse the reply as a JSON object.
    pub async fn complete_json(&self, prompt: &str) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.0,
        };

        debug!(model = %self.model, "chat completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DealScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DealScoutError::Network(format!(
                "{url}: HTTP {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| DealScoutError::parse(format!("invalid chat response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DealScoutError::parse("chat response had no content"))?;

        parse_json_object(&content)
    }
}

/// Parse model output as a JSON object, tolerating a surrounding code fence.
fn parse_json_object(content: &str) -> Result<Value> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(body)
        .map_err(|e| DealScoutError::parse(format!("model returned invalid JSON: {e}")))?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(DealScoutError::parse("model returned JSON that is not an object"))
    }
}

// ---------------------------------------------------------------------------
// Lenient field access
// ---------------------------------------------------------------------------

/// Non-empty string at `key`. Numbers are stringified (NAICS codes often arrive as ints).
pub(crate) fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() && !s.eq_ignore_ascii_case("null") => {
            Some(s.trim().to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Boolean at `key`, accepting `"true"`/`"false"` strings.
pub(crate) fn bool_field(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
        _ => None,
    }
}

/// Number at `key`, accepting numeric strings.
pub(crate) fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::chat_reply;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer};

    fn config_for(server: &MockServer) -> AiConfig {
        AiConfig {
            base_url: server.uri(),
            ..AiConfig::default()
        }
    }

    #[tokio::test]
    async fn complete_json_requests_json_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(
                serde_json::json!({"response_format": {"type": "json_object"}}),
            ))
            .respond_with(chat_reply(r#"{"owner_name": "Jane Doe", "confidence": 0.9}"#))
            .mount(&server)
            .await;

        let client = AiClient::new("sk-test", &config_for(&server)).unwrap();
        let value = client.complete_json("who owns acme?").await.unwrap();
        assert_eq!(text_field(&value, "owner_name").as_deref(), Some("Jane Doe"));
        assert_eq!(number_field(&value, "confidence"), Some(0.9));
    }

    #[tokio::test]
    async fn complete_json_rejects_prose() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(chat_reply("I could not find anything."))
            .mount(&server)
            .await;

        let client = AiClient::new("sk-test", &config_for(&server)).unwrap();
        let err = client.complete_json("prompt").await.unwrap_err();
        assert!(matches!(err, DealScoutError::Parse { .. }));
    }

    #[test]
    fn fenced_json_is_accepted() {
        let value = parse_json_object("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(number_field(&value, "a"), Some(1.0));
    }

    #[test]
    fn lenient_accessors() {
        let value = serde_json::json!({
            "naics_code": 238220,
            "legal_name": "null",
            "is_franchise": "false",
            "blank": "  ",
            "confidence": "0.75"
        });
        assert_eq!(text_field(&value, "naics_code").as_deref(), Some("238220"));
        assert_eq!(text_field(&value, "legal_name"), None);
        assert_eq!(text_field(&value, "blank"), None);
        assert_eq!(bool_field(&value, "is_franchise"), Some(false));
        assert_eq!(number_field(&value, "confidence"), Some(0.75));
        assert_eq!(text_field(&value, "missing"), None);
    }
}
