//! Text-completion collaborator.
//!
//! The generation handler only needs "system instruction + user prompt in,
//! candidate texts out", so that is the whole trait. `OpenAiClient` speaks
//! the OpenAI-compatible `/chat/completions` wire format over reqwest.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Request one completion. Returns the text of every choice in order;
    /// a choice without content comes back as an empty string.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Vec<String>, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Vec<String>, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens,
        };

        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = res.json().await?;
        tracing::debug!(choices = parsed.choices.len(), "Completion received");

        Ok(parsed
            .choices
            .into_iter()
            .map(|choice| {
                choice
                    .message
                    .and_then(|message| message.content)
                    .unwrap_or_default()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[tokio::test]
    async fn test_complete_sends_chat_request_and_reads_choices() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["max_tokens"], 1500);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "Cell biology");
                Json(json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "1. **Cell**: unit of life"}},
                        {"message": {"role": "assistant", "content": null}}
                    ]
                }))
            }),
        );
        let base = serve(app).await;

        let client = OpenAiClient::new(&base, "sk-test", "test-model");
        let choices = client
            .complete("instructions", "Cell biology", 1500)
            .await
            .expect("Completion");
        assert_eq!(choices, vec!["1. **Cell**: unit of life".to_string(), String::new()]);
    }

    #[tokio::test]
    async fn test_missing_choices_is_empty_list() {
        let app = Router::new().route("/v1/chat/completions", post(|| async { Json(json!({})) }));
        let base = serve(app).await;

        let client = OpenAiClient::new(&base, "sk-test", "test-model");
        assert!(client.complete("s", "p", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(app).await;

        let client = OpenAiClient::new(&base, "sk-test", "test-model");
        match client.complete("s", "p", 10).await {
            Err(CompletionError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
