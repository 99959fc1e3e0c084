//! File-backed chat snapshot store.
//!
//! One file per record in a flat history directory. Record names carry
//! the session id prefix, so the lexicographically last match is the
//! most recent snapshot for a chat name.

use std::path::PathBuf;

use colloquy_core::chat::ChatStore;
use colloquy_types::error::ChatError;

#[derive(Debug, Clone)]
pub struct FileChatStore {
    dir: PathBuf,
}

impl FileChatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ChatStore for FileChatStore {
    async fn save(&self, record: &str, payload: &str) -> Result<(), ChatError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| ChatError::Persistence(err.to_string()))?;
        tokio::fs::write(self.dir.join(record), payload)
            .await
            .map_err(|err| ChatError::Persistence(err.to_string()))?;
        tracing::debug!(record, "chat snapshot written");
        Ok(())
    }

    async fn load_latest(&self, matcher: &str) -> Result<String, ChatError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|err| ChatError::Persistence(err.to_string()))?;
        let mut matches = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| ChatError::Persistence(err.to_string()))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(matcher) {
                matches.push(name);
            }
        }
        matches.sort();
        let latest = matches
            .pop()
            .ok_or_else(|| ChatError::SnapshotNotFound(matcher.to_string()))?;
        tokio::fs::read_to_string(self.dir.join(latest))
            .await
            .map_err(|err| ChatError::Persistence(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = FileChatStore::new(tmp.path());
        store.save("2026-01-01-a_alice", "{\"v\":1}").await.unwrap();
        let loaded = store.load_latest("alice").await.unwrap();
        assert_eq!(loaded, "{\"v\":1}");
    }

    #[tokio::test]
    async fn test_load_picks_lexicographically_last_match() {
        let tmp = TempDir::new().unwrap();
        let store = FileChatStore::new(tmp.path());
        store.save("2026-01-01-a_alice", "old").await.unwrap();
        store.save("2026-02-15-b_alice", "new").await.unwrap();
        store.save("2026-03-01-c_bob", "other").await.unwrap();
        assert_eq!(store.load_latest("alice").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_no_match_is_explicit() {
        let tmp = TempDir::new().unwrap();
        let store = FileChatStore::new(tmp.path());
        store.save("2026-01-01-a_alice", "x").await.unwrap();
        let err = store.load_latest("carol").await.unwrap_err();
        assert!(matches!(err, ChatError::SnapshotNotFound(_)));
    }

    #[tokio::test]
    async fn test_save_creates_history_directory() {
        let tmp = TempDir::new().unwrap();
        let store = FileChatStore::new(tmp.path().join("history"));
        store.save("rec_alice", "x").await.unwrap();
        assert!(tmp.path().join("history").join("rec_alice").exists());
    }
}
