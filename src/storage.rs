use chrono::Utc;
use sled::Db;
use thiserror::Error;

use crate::models::{FlashcardBatch, SavedFlashcard, User};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("document encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("user {0} already exists")]
    UserExists(String),
}

/// Document writes and scoped reads for flashcards.
/// Handlers only see this trait so tests can swap in doubles.
pub trait FlashcardStore: Send + Sync {
    /// Append one generation batch. The store assigns id and timestamp.
    fn insert_batch(
        &self,
        user_id: &str,
        subject: &str,
        flashcards: Vec<String>,
    ) -> Result<FlashcardBatch, StorageError>;

    /// Append one kept card under `user_id`/`subject`.
    fn insert_saved(
        &self,
        user_id: &str,
        subject: &str,
        flashcard: String,
    ) -> Result<SavedFlashcard, StorageError>;

    /// All kept-card documents for `user_id`/`subject`, oldest first.
    fn saved_flashcards(
        &self,
        user_id: &str,
        subject: &str,
    ) -> Result<Vec<SavedFlashcard>, StorageError>;
}

/// Account records backing the login endpoint.
pub trait UserStore: Send + Sync {
    fn create_user(&self, user: User) -> Result<(), StorageError>;
    fn get_user(&self, username: &str) -> Result<Option<User>, StorageError>;
}

#[derive(Clone)]  // Sled handles are cheap to clone and thread-safe
pub struct Storage {
    db: Db,
    // - users: username -> User
    // - batches: generated id -> FlashcardBatch (append-only)
    // - saved: user \0 subject \0 generated id -> SavedFlashcard
    user_tree: sled::Tree,
    batch_tree: sled::Tree,
    saved_tree: sled::Tree,
}

impl Storage {
    /// Open or create the sled database at `path`.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Self::from_db(sled::open(path)?)
    }

    /// In-memory database removed on drop. Used by tests and local runs.
    pub fn temporary() -> Result<Self, StorageError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let user_tree = db.open_tree("users")?;
        let batch_tree = db.open_tree("batches")?;
        let saved_tree = db.open_tree("saved")?;
        Ok(Self {
            db,
            user_tree,
            batch_tree,
            saved_tree,
        })
    }

    /// Every batch generated for `user_id`, across subjects, oldest first.
    pub fn batches_for_user(&self, user_id: &str) -> Result<Vec<FlashcardBatch>, StorageError> {
        let mut batches = vec![];
        for item in self.batch_tree.iter() {
            let (_, value) = item?;
            let batch: FlashcardBatch = serde_json::from_slice(&value)?;
            if batch.user_id == user_id {
                batches.push(batch);
            }
        }
        Ok(batches)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    // Monotonic, so big-endian keys iterate in insertion order.
    fn next_key(&self) -> Result<(u64, [u8; 8]), StorageError> {
        let id = self.db.generate_id()?;
        Ok((id, id.to_be_bytes()))
    }
}

/// Key prefix for one user's cards in one subject. Both parts are
/// NUL-terminated so `math` never matches `math 2`; the REST layer rejects
/// NUL inside usernames and subjects.
fn saved_prefix(user_id: &str, subject: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.len() + subject.len() + 2);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(0);
    prefix.extend_from_slice(subject.as_bytes());
    prefix.push(0);
    prefix
}

fn document_id(id: u64) -> String {
    format!("{id:016x}")
}

impl FlashcardStore for Storage {
    fn insert_batch(
        &self,
        user_id: &str,
        subject: &str,
        flashcards: Vec<String>,
    ) -> Result<FlashcardBatch, StorageError> {
        let (id, key) = self.next_key()?;
        let batch = FlashcardBatch {
            id: document_id(id),
            user_id: user_id.to_owned(),
            subject: subject.to_owned(),
            flashcards,
            created_at: Utc::now(),
        };
        self.batch_tree.insert(key, serde_json::to_vec(&batch)?)?;
        Ok(batch)
    }

    fn insert_saved(
        &self,
        user_id: &str,
        subject: &str,
        flashcard: String,
    ) -> Result<SavedFlashcard, StorageError> {
        let (id, suffix) = self.next_key()?;
        let saved = SavedFlashcard {
            id: document_id(id),
            flashcards: vec![flashcard],
            created_at: Utc::now(),
        };
        let mut key = saved_prefix(user_id, subject);
        key.extend_from_slice(&suffix);
        self.saved_tree.insert(key, serde_json::to_vec(&saved)?)?;
        Ok(saved)
    }

    fn saved_flashcards(
        &self,
        user_id: &str,
        subject: &str,
    ) -> Result<Vec<SavedFlashcard>, StorageError> {
        let mut docs = vec![];
        for item in self.saved_tree.scan_prefix(saved_prefix(user_id, subject)) {
            let (_, value) = item?;
            docs.push(serde_json::from_slice(&value)?);
        }
        Ok(docs)
    }
}

impl UserStore for Storage {
    fn create_user(&self, user: User) -> Result<(), StorageError> {
        let json_bytes = serde_json::to_vec(&user)?;
        self.user_tree
            .compare_and_swap(user.username.as_bytes(), None as Option<&[u8]>, Some(json_bytes))?
            .map_err(|_| StorageError::UserExists(user.username.clone()))
    }

    fn get_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        match self.user_tree.get(username.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_flashcards_are_scoped_and_ordered() {
        let storage = Storage::temporary().expect("Failed to open storage");

        storage.insert_saved("alice", "math", "1. **Limit**: a value approached".into()).unwrap();
        storage.insert_saved("alice", "math", "2. **Derivative**: rate of change".into()).unwrap();
        storage.insert_saved("alice", "math 2", "1. **Series**: a sum".into()).unwrap();
        storage.insert_saved("bob", "math", "1. **Other**: not alice's".into()).unwrap();

        let docs = storage.saved_flashcards("alice", "math").expect("Scan failed");
        let cards: Vec<&str> = docs.iter().flat_map(|d| d.flashcards.iter().map(String::as_str)).collect();
        assert_eq!(
            cards,
            vec!["1. **Limit**: a value approached", "2. **Derivative**: rate of change"]
        );
        assert!(docs.iter().all(|d| d.flashcards.len() == 1));
        assert_ne!(docs[0].id, docs[1].id);

        assert!(storage.saved_flashcards("carol", "math").unwrap().is_empty());
    }

    #[test]
    fn test_batch_insert_keeps_full_list() {
        let storage = Storage::temporary().expect("Failed to open storage");
        let cards = vec!["1. A".to_string(), "2. B".to_string()];

        let batch = storage.insert_batch("alice", "bio", cards.clone()).expect("Insert failed");
        assert_eq!(batch.user_id, "alice");
        assert_eq!(batch.subject, "bio");

        let stored = storage.batches_for_user("alice").unwrap();
        assert_eq!(stored, vec![batch]);
        assert_eq!(stored[0].flashcards, cards);
        assert!(storage.batches_for_user("bob").unwrap().is_empty());
    }

    #[test]
    fn test_batch_serializes_camel_case() {
        let storage = Storage::temporary().unwrap();
        let batch = storage.insert_batch("alice", "bio", vec!["1. A".into()]).unwrap();
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["userId"], "alice");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_create_user_rejects_duplicates() {
        let storage = Storage::temporary().unwrap();
        let user = User {
            username: "alice".into(),
            password_hash: "hash".into(),
        };
        storage.create_user(user.clone()).expect("First insert");
        assert!(matches!(
            storage.create_user(user),
            Err(StorageError::UserExists(name)) if name == "alice"
        ));
        assert_eq!(storage.get_user("alice").unwrap().unwrap().password_hash, "hash");
        assert!(storage.get_user("nobody").unwrap().is_none());
    }
}
