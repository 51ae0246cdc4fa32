//! Persistence of in-progress runs.
//!
//! Stores are plain key-value byte stores. Sessions never talk to them
//! directly: they go through a [`ProgressSlot`], which owns the key of the
//! session's snapshot and turns every storage failure into a log line so that
//! a broken store can never break the quiz flow.

use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::model::SavedState;

/// Name of the slot holding a run snapshot
pub const PROGRESS_KEY: &str = "quizProgress";

/// Failure of a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("storage is unavailable")]
    Unavailable,
}

/// Key-value store for string values
pub trait ProgressStore: Send + Sync + fmt::Debug {
    /// Value under `key`, or `None` when unset
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Delete `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store, lost on restart
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    available: bool,
}

impl MemoryStore {
    /// Empty working store
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: true,
        }
    }

    /// A store that fails every call, like a browser with storage disabled
    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: false,
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        if !self.available {
            return Err(StoreError::Unavailable);
        }
        self.entries.lock().map_err(|_| StoreError::Unavailable)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Store keeping one JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the store directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{name}.json"))
    }
}

impl ProgressStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The snapshot slot of one session
#[derive(Debug, Clone)]
pub struct ProgressSlot {
    store: Arc<dyn ProgressStore>,
    key: String,
}

impl ProgressSlot {
    /// The single, unscoped `quizProgress` slot
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            key: PROGRESS_KEY.to_string(),
        }
    }

    /// A `quizProgress` slot scoped to one session id
    pub fn for_session(store: Arc<dyn ProgressStore>, session_id: impl fmt::Display) -> Self {
        Self {
            store,
            key: format!("{PROGRESS_KEY}-{session_id}"),
        }
    }

    /// Store key of this slot
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw stored text, if any
    pub fn raw(&self) -> Option<String> {
        match self.store.get(&self.key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %self.key, "Could not read saved progress: {e}");
                None
            }
        }
    }

    /// Load the snapshot, discarding it if it cannot be parsed
    pub fn load(&self) -> Option<SavedState> {
        let raw = self.raw()?;
        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(key = %self.key, "Discarding unreadable saved progress: {e}");
                self.clear();
                None
            }
        }
    }

    /// Overwrite the snapshot
    pub fn save(&self, state: &SavedState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %self.key, "Could not serialize progress: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &json) {
            tracing::warn!(key = %self.key, "Could not save progress: {e}");
        }
    }

    /// Delete the snapshot
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            tracing::warn!(key = %self.key, "Could not remove saved progress: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, Question};

    fn saved() -> SavedState {
        SavedState {
            quiz_data: vec![Question {
                question: "2 + 2?".to_string(),
                options: vec!["3".into(), "4".into(), "5".into(), "22".into()],
                correct_answer: "4".to_string(),
                explanation: "Arithmetic.".to_string(),
            }],
            current_question_index: 0,
            user_answers: vec![Some("4".to_string())],
            score: 1,
            topic: "Maths".to_string(),
            language: Language::En,
            generated_challenge_code: Some("abc".to_string()),
        }
    }

    #[test]
    fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.remove("k").unwrap();
    }

    #[test]
    fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::unavailable();
        assert!(matches!(store.get("k"), Err(StoreError::Unavailable)));
        assert!(matches!(store.set("k", "v"), Err(StoreError::Unavailable)));
        assert!(matches!(store.remove("k"), Err(StoreError::Unavailable)));
    }

    #[test]
    fn test_file_store_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("progress")).unwrap();

        assert_eq!(store.get("quizProgress-1").unwrap(), None);
        store.set("quizProgress-1", "{\"a\":1}").unwrap();
        assert_eq!(
            store.get("quizProgress-1").unwrap(),
            Some("{\"a\":1}".to_string())
        );
        store.set("quizProgress-1", "{}").unwrap();
        assert_eq!(store.get("quizProgress-1").unwrap(), Some("{}".to_string()));

        store.remove("quizProgress-1").unwrap();
        assert_eq!(store.get("quizProgress-1").unwrap(), None);
        store.remove("quizProgress-1").unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("../escape/attempt", "x").unwrap();

        assert!(store.root().join("___escape_attempt.json").exists());
        assert_eq!(store.get("../escape/attempt").unwrap(), Some("x".to_string()));
    }

    #[test]
    fn test_slot_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let slot = ProgressSlot::for_session(store.clone(), "abc");
        assert_eq!(slot.key(), "quizProgress-abc");
        assert_eq!(slot.load(), None);

        slot.save(&saved());
        assert_eq!(slot.load(), Some(saved()));
        assert!(store.get("quizProgress-abc").unwrap().is_some());

        slot.clear();
        assert_eq!(slot.load(), None);
    }

    #[test]
    fn test_slot_discards_corrupt_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.set(PROGRESS_KEY, "{not json").unwrap();

        let slot = ProgressSlot::new(store.clone());
        assert_eq!(slot.load(), None);
        assert_eq!(store.get(PROGRESS_KEY).unwrap(), None);
    }

    #[test]
    fn test_slot_swallows_store_failures() {
        let slot = ProgressSlot::new(Arc::new(MemoryStore::unavailable()));
        slot.save(&saved());
        slot.clear();
        assert_eq!(slot.load(), None);
        assert_eq!(slot.raw(), None);
    }
}
