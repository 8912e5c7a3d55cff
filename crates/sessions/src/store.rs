//! JSONL persistence for session snapshots.
//!
//! One file per session: the first line is a small header record, each
//! following line one message. A snapshot store has no append path, so every
//! save rewrites the file whole under an exclusive lock.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, ErrorKind, Write},
    path::PathBuf,
};

use {
    fd_lock::RwLock,
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::{
    error::{Context, Error, Result},
    message::ChatMessage,
    session::ChatSession,
};

/// First line of every session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionHeader {
    id: String,
    created_at: u64,
    updated_at: u64,
}

/// Snapshot-per-file JSONL session storage with file locking.
pub struct SessionStore {
    pub base_dir: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Sanitize a session id for use as a filename. Uuid ids pass through
    /// unchanged.
    fn id_to_filename(id: &str) -> String {
        id.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.jsonl", Self::id_to_filename(id)))
    }

    /// Write the full snapshot, replacing any previous copy.
    pub async fn save(&self, session: &ChatSession) -> Result<()> {
        let path = self.path_for(&session.id);
        let header = SessionHeader {
            id: session.id.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        };
        let mut payload = serde_json::to_string(&header)?;
        for message in &session.messages {
            payload.push('\n');
            payload.push_str(&serde_json::to_string(message)?);
        }
        payload.push('\n');

        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let handle = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?;
            let mut locked = RwLock::new(handle);
            let mut out = locked
                .write()
                .map_err(|e| Error::lock_failed(e.to_string()))?;
            out.write_all(payload.as_bytes())?;
            Ok(())
        })
        .await??;

        Ok(())
    }

    /// Load a snapshot. `None` when nothing is stored under `id`.
    ///
    /// Malformed message lines are skipped with a warning; a malformed
    /// header is an error, since nothing sensible can be rebuilt from it.
    pub async fn load(&self, id: &str) -> Result<Option<ChatSession>> {
        let path = self.path_for(id);

        tokio::task::spawn_blocking(move || -> Result<Option<ChatSession>> {
            if !path.exists() {
                return Ok(None);
            }
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let mut lines = reader.lines();

            let header_line = loop {
                match lines.next() {
                    Some(line) => {
                        let line = line?;
                        if !line.trim().is_empty() {
                            break line;
                        }
                    },
                    // An empty file carries no session.
                    None => return Ok(None),
                }
            };
            let header: SessionHeader = serde_json::from_str(header_line.trim())
                .with_context(|| format!("malformed session header in {}", path.display()))?;

            let mut messages = Vec::new();
            for line in lines {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChatMessage>(trimmed) {
                    Ok(message) => messages.push(message),
                    Err(e) => {
                        warn!(file = %path.display(), "skipping malformed message line: {e}");
                    },
                }
            }

            Ok(Some(ChatSession {
                id: header.id,
                messages,
                created_at: header.created_at,
                updated_at: header.updated_at,
            }))
        })
        .await?
    }

    /// Remove the stored snapshot. Removing an absent one is not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);

        tokio::task::spawn_blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        })
        .await??;

        Ok(())
    }

    /// List stored session ids by scanning the base directory.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.strip_suffix(".jsonl").map(str::to_string)
            })
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::message::ChatMessage,
    };

    fn temp_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        (store, dir)
    }

    fn sample_session() -> ChatSession {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("where is my certificate?"));
        session.push(ChatMessage::assistant("under Completed Courses"));
        session
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let (store, _dir) = temp_store();
        let session = sample_session();

        store.save(&session).await.unwrap();
        let loaded = store.load(&session.id).await.unwrap().unwrap();

        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let (store, _dir) = temp_store();
        assert!(store.load("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let (store, _dir) = temp_store();
        let mut session = sample_session();
        store.save(&session).await.unwrap();

        session.push(ChatMessage::user("and the next course?"));
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 3);
        assert_eq!(loaded.messages[2].content, "and the next course?");
    }

    #[tokio::test]
    async fn test_delete_removes_the_file() {
        let (store, _dir) = temp_store();
        let session = sample_session();
        store.save(&session).await.unwrap();

        store.delete(&session.id).await.unwrap();
        assert!(store.load(&session.id).await.unwrap().is_none());

        // deleting again is fine
        store.delete(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_ids_scans_the_directory() {
        let (store, _dir) = temp_store();
        let a = sample_session();
        let b = sample_session();
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let mut ids = store.list_ids();
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_malformed_message_lines_are_skipped() {
        let (store, dir) = temp_store();
        let session = sample_session();
        store.save(&session).await.unwrap();

        let path = dir.path().join(format!("{}.jsonl", session.id));
        let mut raw = fs::read_to_string(&path).unwrap();
        raw.push_str("{not json at all\n");
        fs::write(&path, raw).unwrap();

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_header_is_an_error() {
        let (store, dir) = temp_store();
        let path = dir.path().join("broken.jsonl");
        fs::write(&path, "{definitely broken\n").unwrap();

        let err = store.load("broken").await.unwrap_err();
        assert!(err.to_string().contains("malformed session header"));
    }

    #[tokio::test]
    async fn test_empty_file_is_treated_as_absent() {
        let (store, dir) = temp_store();
        fs::write(dir.path().join("hollow.jsonl"), "").unwrap();

        assert!(store.load("hollow").await.unwrap().is_none());
    }
}
