//! HTTP client for the flashcard API, used by the CLI and by the review
//! session as its backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::SavedFlashcard;
use crate::rest::{FlashcardsResponse, GenerateRequest, KeepRequest, LoginResponse, UserLogin, UserRegister};
use crate::review::ReviewBackend;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid server url {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .post(self.url(&["api", "register"])?)
            .json(&UserRegister {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let _: Value = read_json(res).await?;
        Ok(())
    }

    /// Returns the bearer token; callers persist it themselves.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .post(self.url(&["api", "login"])?)
            .json(&UserLogin {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: LoginResponse = read_json(res).await?;
        Ok(body.token)
    }

    pub async fn generate_flashcards(
        &self,
        prompt: &str,
        subject: &str,
    ) -> Result<Vec<String>, ClientError> {
        let request = self
            .http
            .post(self.url(&["api", "generate-flashcards"])?)
            .json(&GenerateRequest {
                prompt: prompt.to_string(),
                subject: Some(subject.to_string()),
            });
        let body: FlashcardsResponse = read_json(self.authorized(request).send().await?).await?;
        Ok(body.flashcards)
    }

    pub async fn saved_flashcards(&self, subject: &str) -> Result<Vec<String>, ClientError> {
        let request = self
            .http
            .get(self.url(&["api", "subjects", subject, "flashcards"])?);
        let body: FlashcardsResponse = read_json(self.authorized(request).send().await?).await?;
        Ok(body.flashcards)
    }

    pub async fn keep_flashcard(
        &self,
        subject: &str,
        flashcard: &str,
    ) -> Result<SavedFlashcard, ClientError> {
        let request = self
            .http
            .post(self.url(&["api", "subjects", subject, "flashcards"])?)
            .json(&KeepRequest {
                flashcard: flashcard.to_string(),
            });
        read_json(self.authorized(request).send().await?).await
    }
}

/// Decode a success body, or turn an error status into `ClientError::Status`
/// carrying the server's `{"error": ...}` message when there is one.
async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }

    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ReviewBackend for ApiClient {
    async fn load_saved(&self, subject: &str) -> Result<Vec<String>, ClientError> {
        self.saved_flashcards(subject).await
    }

    async fn generate(&self, prompt: &str, subject: &str) -> Result<Vec<String>, ClientError> {
        self.generate_flashcards(prompt, subject).await
    }

    async fn keep(&self, subject: &str, flashcard: &str) -> Result<(), ClientError> {
        self.keep_flashcard(subject, flashcard).await.map(|_| ())
    }
}

impl ClientError {
    /// JSON shape the CLI prints for failures.
    pub fn to_json(&self) -> Value {
        match self {
            ClientError::Status { status, message } => json!({ "status": status, "error": message }),
            other => json!({ "error": other.to_string() }),
        }
    }
}
