//! Persistence of the last-known thread identifier.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A single-slot key-value store for the assistant thread identifier.
///
/// The assistant client reads it once at construction and writes it on every successful thread
/// confirmation or creation.  Implementations must not fail loudly: a store that cannot persist
/// simply forgets, and the next session creates a new thread.
pub trait ThreadStore: Send + Sync {
    /// The stored thread identifier, if any.
    fn load(&self) -> Option<String>;

    /// Remember `thread_id`, replacing any previous value.
    fn save(&self, thread_id: &str);

    /// Forget the stored identifier.
    fn clear(&self);
}

/// A [`ThreadStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryThreadStore {
    thread_id: Mutex<Option<String>>,
}

impl MemoryThreadStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `thread_id`.
    pub fn with_thread_id(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Mutex::new(Some(thread_id.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.thread_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ThreadStore for MemoryThreadStore {
    fn load(&self) -> Option<String> {
        self.slot().clone()
    }

    fn save(&self, thread_id: &str) {
        *self.slot() = Some(thread_id.to_string());
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}

/// A [`ThreadStore`] backed by a file holding just the identifier.
#[derive(Debug, Clone)]
pub struct FileThreadStore {
    path: PathBuf,
}

impl FileThreadStore {
    /// Create a store that reads and writes `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this store uses.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ThreadStore for FileThreadStore {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|id| !id.is_empty()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "could not read thread id: {err}");
                None
            }
        }
    }

    fn save(&self, thread_id: &str) {
        if let Err(err) = std::fs::write(&self.path, thread_id) {
            tracing::warn!(path = %self.path.display(), "could not persist thread id: {err}");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "could not remove thread id: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("colloquy-{}-{name}", std::process::id()))
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryThreadStore::new();
        assert!(store.load().is_none());
        store.save("thread_1");
        assert_eq!(store.load().as_deref(), Some("thread_1"));
        store.save("thread_2");
        assert_eq!(store.load().as_deref(), Some("thread_2"));
        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn memory_store_seeded() {
        let store = MemoryThreadStore::with_thread_id("thread_seed");
        assert_eq!(store.load().as_deref(), Some("thread_seed"));
    }

    #[test]
    fn file_store_missing_file() {
        let store = FileThreadStore::new(scratch_path("missing"));
        assert!(store.load().is_none());
        store.clear();
    }

    #[test]
    fn file_store_persists() {
        let path = scratch_path("persist");
        let store = FileThreadStore::new(&path);
        store.save("thread_abc");
        assert_eq!(FileThreadStore::new(&path).load().as_deref(), Some("thread_abc"));
        store.clear();
        assert!(store.load().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn file_store_ignores_blank_file() {
        let path = scratch_path("blank");
        std::fs::write(&path, "  \n").unwrap();
        let store = FileThreadStore::new(&path);
        assert!(store.load().is_none());
        store.clear();
    }
}
