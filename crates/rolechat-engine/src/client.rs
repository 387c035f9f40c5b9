//! Completion service client.
//!
//! [`CompletionClient`] is the seam between the conversation state and the
//! network. [`OpenAiClient`] talks to an OpenAI-compatible
//! `/chat/completions` endpoint.

use crate::chat::RequestEnvelope;
use crate::config::{ApiKey, Config};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest slice of a raw error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 240;

/// Something that can turn a request envelope into an assistant reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `envelope` and return the text of the first completion choice.
    async fn complete(&self, envelope: &RequestEnvelope) -> Result<String, CompletionError>;
}

/// Send `envelope` through `client`.
pub async fn complete_conversation<C>(
    client: &C,
    envelope: &RequestEnvelope,
) -> Result<String, CompletionError>
where
    C: CompletionClient + ?Sized,
{
    client.complete(envelope).await
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl OpenAiClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: &str, api_key: ApiKey, timeout: Duration) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CompletionError::Network)?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            timeout,
        })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &Config, api_key: ApiKey) -> Result<Self, CompletionError> {
        Self::new(
            &config.api_base_url,
            api_key,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.timeout.as_secs())
        } else {
            CompletionError::Network(err)
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, envelope: &RequestEnvelope) -> Result<String, CompletionError> {
        let start = Instant::now();
        debug!(
            model = %envelope.model,
            messages = envelope.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(envelope)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let detail = error_detail(&body);
            warn!(%status, %detail, "completion request rejected");
            return Err(CompletionError::Remote { status, detail });
        }

        let reply = parse_reply(&body)?;

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(elapsed_ms, chars = reply.len(), "completion received");

        Ok(reply)
    }
}

/// Extract `choices[0].message.content` from a success body.
fn parse_reply(body: &str) -> Result<String, CompletionError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::MalformedResponse("response has no choices".into()))?;

    choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| {
            CompletionError::MalformedResponse("first choice has no message content".into())
        })
}

/// Prefer the service's `error.message`, else a prefix of the raw body.
fn error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return parsed.error.message;
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let mut snip: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        snip.push_str("...");
        snip
    } else {
        trimmed.to_string()
    }
}

/// Errors that can occur while completing a conversation.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The request could not be completed.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// No response within the configured timeout.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Non-success status from the service.
    #[error("Completion service returned {status}: {detail}")]
    Remote { status: StatusCode, detail: String },

    /// Success status but the reply could not be read.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request task ended without producing a result.
    #[error("Request aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{build_request_envelope, Message, Transcript, DEFAULT_GREETING};
    use crate::preset::RolePreset;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope() -> RequestEnvelope {
        let mut transcript = Transcript::with_greeting(DEFAULT_GREETING);
        transcript.push(Message::outgoing("hello"));
        build_request_envelope(&transcript, RolePreset::Cowboy, "gpt-test")
    }

    fn client_for(server: &MockServer, timeout: Duration) -> OpenAiClient {
        let key = ApiKey::new("sk-test").unwrap();
        OpenAiClient::new(&format!("{}/v1", server.uri()), key, timeout).unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let key = ApiKey::new("sk-test").unwrap();
        let client =
            OpenAiClient::new("https://api.example.com/v1/", key, Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_parse_reply_rejects_missing_choices() {
        assert!(matches!(
            parse_reply(r#"{"id":"x"}"#),
            Err(CompletionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"choices":[]}"#),
            Err(CompletionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"choices":[{"message":{"content":42}}]}"#),
            Err(CompletionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_reply("not json"),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_detail_prefers_service_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_detail(body), "Incorrect API key provided");

        let long = "x".repeat(500);
        let detail = error_detail(&long);
        assert!(detail.ends_with("..."));
        assert_eq!(detail.chars().count(), MAX_ERROR_BODY_CHARS + 3);
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "messages": [
                    {"role": "system", "content": "Answer like you are a cowboy"},
                    {"role": "assistant", "content": DEFAULT_GREETING},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Howdy, partner!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let reply = complete_conversation(&client, &envelope()).await.unwrap();
        assert_eq!(reply, "Howdy, partner!");
    }

    #[tokio::test]
    async fn test_complete_remote_error_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.complete(&envelope()).await.unwrap_err();
        match err {
            CompletionError::Remote { status, detail } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(detail, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.complete(&envelope()).await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        let err = client.complete(&envelope()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_complete_connection_refused_is_network_error() {
        let key = ApiKey::new("sk-test").unwrap();
        let client = OpenAiClient::new("http://127.0.0.1:9", key, Duration::from_secs(2)).unwrap();
        let err = client.complete(&envelope()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Network(_)));
    }
}
