//! Review session: the client-side state behind the Keep/Discard workflow.
//!
//! Two lists are held. `generated` is what the last generation call
//! returned and has not been kept or discarded yet; `saved` mirrors the
//! user's stored cards for the subject. Generated cards get a UUID when
//! they arrive and are addressed by it, so a removal never hits the wrong
//! card after the list shifts.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::client::ClientError;

/// Remote operations the session needs.
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn load_saved(&self, subject: &str) -> Result<Vec<String>, ClientError>;
    async fn generate(&self, prompt: &str, subject: &str) -> Result<Vec<String>, ClientError>;
    async fn keep(&self, subject: &str, flashcard: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("no generated card with id {0}")]
    UnknownCard(Uuid),

    #[error(transparent)]
    Backend(#[from] ClientError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
}

/// Holds `Generating` until dropped, so a cancelled request still ends idle.
struct LoadingGuard<'a>(&'a mut Phase);

impl<'a> LoadingGuard<'a> {
    fn enter(phase: &'a mut Phase) -> Self {
        *phase = Phase::Generating;
        Self(phase)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = Phase::Idle;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCard {
    pub id: Uuid,
    pub text: String,
}

pub struct ReviewSession<B> {
    backend: B,
    subject: String,
    phase: Phase,
    generated: Vec<PendingCard>,
    saved: Vec<String>,
}

impl<B: ReviewBackend> ReviewSession<B> {
    pub fn new(backend: B, subject: impl Into<String>) -> Self {
        Self {
            backend,
            subject: subject.into(),
            phase: Phase::Idle,
            generated: vec![],
            saved: vec![],
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn generated(&self) -> &[PendingCard] {
        &self.generated
    }

    pub fn saved(&self) -> &[String] {
        &self.saved
    }

    /// Replace `saved` with the stored cards for this subject.
    pub async fn mount(&mut self) -> Result<usize, ReviewError> {
        self.saved = self.backend.load_saved(&self.subject).await?;
        tracing::debug!(subject = %self.subject, count = self.saved.len(), "Saved flashcards loaded");
        Ok(self.saved.len())
    }

    /// Ask for a fresh set of cards. On success `generated` is replaced;
    /// on failure both lists stay as they were. Loading is cleared either way.
    pub async fn generate(&mut self, prompt: &str) -> Result<usize, ReviewError> {
        if prompt.trim().is_empty() {
            return Err(ReviewError::EmptyPrompt);
        }

        let result = {
            let _loading = LoadingGuard::enter(&mut self.phase);
            self.backend.generate(prompt, &self.subject).await
        };

        match result {
            Ok(cards) => {
                self.generated = cards
                    .into_iter()
                    .map(|text| PendingCard {
                        id: Uuid::new_v4(),
                        text,
                    })
                    .collect();
                Ok(self.generated.len())
            }
            Err(e) => {
                tracing::error!("Error generating flashcards: {e}");
                Err(e.into())
            }
        }
    }

    /// Persist one generated card, then move it to `saved`. A failed write
    /// leaves the card in `generated`.
    pub async fn keep(&mut self, id: Uuid) -> Result<(), ReviewError> {
        let card = self
            .generated
            .iter()
            .find(|card| card.id == id)
            .ok_or(ReviewError::UnknownCard(id))?;

        if let Err(e) = self.backend.keep(&self.subject, &card.text).await {
            tracing::error!("Error saving flashcard: {e}");
            return Err(e.into());
        }

        let card = self.take(id)?;
        self.saved.push(card.text);
        Ok(())
    }

    /// Drop a generated card without persisting it.
    pub fn discard(&mut self, id: Uuid) -> Result<PendingCard, ReviewError> {
        self.take(id)
    }

    fn take(&mut self, id: Uuid) -> Result<PendingCard, ReviewError> {
        let index = self
            .generated
            .iter()
            .position(|card| card.id == id)
            .ok_or(ReviewError::UnknownCard(id))?;
        Ok(self.generated.remove(index))
    }
}
