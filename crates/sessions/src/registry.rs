//! Registry of known sessions and the owner-level retention policy.
//!
//! A small JSON index kept next to the session files: one entry per session
//! (owner, timestamps, message count). The registry is where the per-owner
//! session cap and the inactivity expiry from [`crate::limits::SessionLimits`]
//! are enforced; the session files themselves are deleted by the caller.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

use crate::{error::Result, limits::SessionLimits, session::ChatSession};

/// A single session entry in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: String,
    pub owner: String,
    pub created_at: u64,
    pub updated_at: u64,
    pub message_count: u32,
}

/// JSON file-backed index mapping session id → [`SessionEntry`].
pub struct SessionRegistry {
    path: PathBuf,
    entries: HashMap<String, SessionEntry>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl SessionRegistry {
    /// Load the index from disk, or start empty. An unparsable index is
    /// reset and rebuilt as sessions are touched.
    pub fn load(path: PathBuf) -> Result<Self> {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(file = %path.display(), "resetting unreadable session index: {e}");
                HashMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    /// Record or refresh the entry for `session`.
    pub fn upsert(&mut self, owner: &str, session: &ChatSession) -> Result<()> {
        self.entries.insert(
            session.id.clone(),
            SessionEntry {
                id: session.id.clone(),
                owner: owner.to_string(),
                created_at: session.created_at,
                updated_at: session.updated_at,
                message_count: session.messages.len() as u32,
            },
        );
        self.save()
    }

    /// Drop the entry for `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        if self.entries.remove(id).is_some() {
            self.save()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SessionEntry> {
        self.entries.get(id)
    }

    /// Entries for `owner`, most recently updated first.
    #[must_use]
    pub fn list_for(&self, owner: &str) -> Vec<SessionEntry> {
        let mut entries: Vec<SessionEntry> = self
            .entries
            .values()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        entries
    }

    /// Evict the oldest-updated sessions beyond `max_sessions_per_user`.
    ///
    /// Returns the evicted ids so the caller can delete the stored
    /// snapshots.
    pub fn evict_over_cap(&mut self, owner: &str, limits: &SessionLimits) -> Result<Vec<String>> {
        let cap = limits.max_sessions_per_user as usize;
        let entries = self.list_for(owner);
        if entries.len() <= cap {
            return Ok(vec![]);
        }
        let evicted: Vec<String> = entries[cap..].iter().map(|e| e.id.clone()).collect();
        for id in &evicted {
            self.entries.remove(id);
        }
        self.save()?;
        Ok(evicted)
    }

    /// Drop sessions idle for longer than `session_expiry_days`, across all
    /// owners. Returns the expired ids.
    pub fn sweep_expired(&mut self, limits: &SessionLimits) -> Result<Vec<String>> {
        let cutoff = now_ms().saturating_sub(limits.expiry_ms());
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.updated_at < cutoff)
            .map(|e| e.id.clone())
            .collect();
        if expired.is_empty() {
            return Ok(vec![]);
        }
        for id in &expired {
            self.entries.remove(id);
        }
        self.save()?;
        Ok(expired)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, rendered)?;
        Ok(())
    }
}
