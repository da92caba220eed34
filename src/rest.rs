//! REST API layer using Axum (exposed on port 11111 by default)
//!
//! - `POST /api/generate-flashcards`: prompt in, parsed cards out; the batch is stored.
//! - `GET|POST /api/subjects/:subject/flashcards`: the caller's kept cards per subject.
//! - `POST /api/register`, `POST /api/login`: local accounts issuing bearer tokens.
//!
//! Collaborators (storage, completion service, authenticator) are injected
//! through `AppState`, never reached as globals.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{hash_password, verify_password, Authenticator, JwtAuthenticator};
use crate::completion::CompletionService;
use crate::error::AppError;
use crate::flashcards::{parse_flashcards, SYSTEM_INSTRUCTION};
use crate::models::{SavedFlashcard, User};
use crate::storage::{FlashcardStore, Storage, StorageError, UserStore};

pub const SUBJECT_REQUIRED: &str = "Subject is required.";

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
#[derive(Clone)]
pub struct AppState {
    flashcards: Arc<dyn FlashcardStore>,
    users: Arc<dyn UserStore>,
    completion: Arc<dyn CompletionService>,
    auth: Arc<dyn Authenticator>,
    tokens: JwtAuthenticator,
    max_tokens: u32,
}

impl AppState {
    pub fn new(
        storage: Storage,
        completion: Arc<dyn CompletionService>,
        tokens: JwtAuthenticator,
        max_tokens: u32,
    ) -> Self {
        Self {
            flashcards: Arc::new(storage.clone()),
            users: Arc::new(storage),
            completion,
            auth: Arc::new(tokens.clone()),
            tokens,
            max_tokens,
        }
    }

    /// Replace how requests are mapped to user ids.
    pub fn with_authenticator(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn with_flashcard_store(mut self, store: Arc<dyn FlashcardStore>) -> Self {
        self.flashcards = store;
        self
    }
}

/// Authenticated caller, inserted by `auth_middleware`.
#[derive(Clone, Debug)]
pub struct Identity(pub String);

#[derive(Serialize, Deserialize)]
pub struct UserRegister {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct UserLogin {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Body of `POST /api/generate-flashcards`
#[derive(Serialize, Deserialize, Default)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Card list returned by generation and by the saved-card listing
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct FlashcardsResponse {
    pub flashcards: Vec<String>,
}

/// Body of `POST /api/subjects/:subject/flashcards`
#[derive(Serialize, Deserialize)]
pub struct KeepRequest {
    pub flashcard: String,
}

/// Generic REST response (JSON)
#[derive(Serialize, Deserialize)]
pub struct RestResponse {
    pub success: bool,
    pub message: String,
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = state
        .auth
        .authenticate(req.headers())
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(Identity(user_id));
    Ok(next.run(req).await)
}

/// Create Axum router with the flashcard endpoints
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let auth_routes = Router::new()
        .route("/api/generate-flashcards", post(generate_flashcards_handler))
        .route(
            "/api/subjects/:subject/flashcards",
            get(list_saved_handler).post(keep_flashcard_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/health", get(health_handler))
        .merge(auth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Trimmed subject, or the validation error when it is missing or blank.
fn require_subject(subject: Option<&str>) -> Result<&str, AppError> {
    let subject = subject.map(str::trim).unwrap_or_default();
    if subject.is_empty() {
        return Err(AppError::Validation(SUBJECT_REQUIRED.to_string()));
    }
    if subject.contains('\0') {
        return Err(AppError::Validation("Subject may not contain NUL.".to_string()));
    }
    Ok(subject)
}

async fn generate_flashcards_handler(
    State(state): State<Arc<AppState>>,
    Extension(Identity(user_id)): Extension<Identity>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<FlashcardsResponse>, AppError> {
    let Json(payload) = payload?;
    let subject = require_subject(payload.subject.as_deref())?;

    info!(user_id = %user_id, subject, prompt_len = payload.prompt.len(), "Generating flashcards");

    let choices = state
        .completion
        .complete(SYSTEM_INSTRUCTION, &payload.prompt, state.max_tokens)
        .await?;

    let Some(first) = choices.first() else {
        return Err(AppError::UpstreamEmpty("No flashcards generated.".to_string()));
    };
    let generated = first.trim();
    if generated.is_empty() {
        return Err(AppError::UpstreamEmpty("Failed to generate flashcards.".to_string()));
    }

    let flashcards = parse_flashcards(generated);
    let batch = state.flashcards.insert_batch(&user_id, subject, flashcards)?;
    info!(batch_id = %batch.id, count = batch.flashcards.len(), "Flashcard batch saved");

    Ok(Json(FlashcardsResponse {
        flashcards: batch.flashcards,
    }))
}

/// Handler: every kept card for the caller in `subject`, flattened oldest first
async fn list_saved_handler(
    State(state): State<Arc<AppState>>,
    Extension(Identity(user_id)): Extension<Identity>,
    Path(subject): Path<String>,
) -> Result<Json<FlashcardsResponse>, AppError> {
    let subject = require_subject(Some(subject.as_str()))?;
    let docs = state.flashcards.saved_flashcards(&user_id, subject)?;
    let flashcards = docs.into_iter().flat_map(|doc| doc.flashcards).collect();
    Ok(Json(FlashcardsResponse { flashcards }))
}

/// Handler: store one kept card as its own document
async fn keep_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(Identity(user_id)): Extension<Identity>,
    Path(subject): Path<String>,
    payload: Result<Json<KeepRequest>, JsonRejection>,
) -> Result<Json<SavedFlashcard>, AppError> {
    let subject = require_subject(Some(subject.as_str()))?;
    let Json(payload) = payload?;
    if payload.flashcard.trim().is_empty() {
        return Err(AppError::Validation("Flashcard is required.".to_string()));
    }

    let saved = state
        .flashcards
        .insert_saved(&user_id, subject, payload.flashcard)?;
    info!(user_id = %user_id, subject, doc_id = %saved.id, "Flashcard kept");
    Ok(Json(saved))
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserRegister>, JsonRejection>,
) -> Result<Json<RestResponse>, AppError> {
    let Json(payload) = payload?;
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Username and password are required.".to_string()));
    }
    if username.contains('\0') {
        return Err(AppError::Validation("Username may not contain NUL.".to_string()));
    }

    let hash = hash_password(&payload.password).map_err(|e| AppError::Internal(e.to_string()))?;
    let user = User {
        username: username.to_string(),
        password_hash: hash,
    };
    match state.users.create_user(user) {
        Ok(()) => {}
        Err(StorageError::UserExists(_)) => {
            return Err(AppError::Validation("Username already taken.".to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    info!(username, "User registered");
    Ok(Json(RestResponse {
        success: true,
        message: "User registered".to_string(),
    }))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserLogin>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .users
        .get_user(payload.username.trim())?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash).unwrap_or(false) {
        return Err(AppError::Unauthorized);
    }

    let token = state
        .tokens
        .create_jwt(&user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(LoginResponse { token }))
}

/// Health check handler
async fn health_handler() -> Json<RestResponse> {
    Json(RestResponse {
        success: true,
        message: "flashcards API healthy".to_string(),
    })
}
