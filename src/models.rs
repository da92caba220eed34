use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthPayload {
    pub sub: String, // username
    pub exp: usize,
}

/// Every card produced by one generation call, stored together.
/// Written once, never updated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardBatch {
    pub id: String,
    pub user_id: String,
    pub subject: String,
    pub flashcards: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A single card the user chose to keep. `flashcards` always holds exactly
/// one entry; the array shape matches the batch documents so both can be
/// flattened the same way.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedFlashcard {
    pub id: String,
    pub flashcards: Vec<String>,
    pub created_at: DateTime<Utc>,
}
