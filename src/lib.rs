//! Flashcard Forge: AI-generated flashcards with a keep/discard review flow.
//!
//! The server turns a topic prompt into numbered flashcards through an
//! OpenAI-compatible completion API and stores them in sled per user and
//! subject. The client side (`client` + `review`) drives generation and
//! the Keep/Discard workflow.

pub mod auth;
pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod flashcards;
pub mod models;
// REST API module: Axum HTTP handlers (generation, saved cards, accounts)
pub mod rest;
pub mod review;
pub mod storage;
pub mod telemetry;
