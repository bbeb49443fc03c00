//! Conversation and settings persistence.
//!
//! The relay itself keeps no history. Clients persist finished conversations
//! through the [`ConversationStore`] trait; [`JsonFileStore`] keeps them in a
//! JSON file, newest first, capped at [`MAX_CONVERSATIONS`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::upstream::ChatMessage;

/// Conversations kept by [`JsonFileStore`].
pub const MAX_CONVERSATIONS: usize = 50;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Timestamp formatting failed: {0}")]
    Time(#[from] time::error::Format),
}

/// A saved conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// RFC 3339 timestamp.
    pub updated_at: String,
}

/// Input to [`ConversationStore::save`]; missing fields are filled in.
#[derive(Debug, Clone, Default)]
pub struct ConversationDraft {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub updated_at: Option<String>,
}

pub trait ConversationStore {
    /// Insert or replace a conversation, returning the stored record.
    fn save(&self, draft: ConversationDraft) -> Result<ConversationRecord, StoreError>;

    /// All conversations, most recently inserted first.
    fn list(&self) -> Vec<ConversationRecord>;

    fn get(&self, id: Uuid) -> Option<ConversationRecord> {
        self.list().into_iter().find(|c| c.id == id)
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub model: String,
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            theme: "dark".to_string(),
        }
    }
}

/// Partial settings update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub model: Option<String>,
    pub theme: Option<String>,
}

/// File-backed store: `conversations.json` and `settings.json` in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn conversations_path(&self) -> PathBuf {
        self.dir.join("conversations.json")
    }

    fn settings_path(&self) -> PathBuf {
        self.dir.join("settings.json")
    }

    /// Read a JSON file, treating a missing or corrupt file as absent.
    fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable store file");
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(value)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        Self::read_json(&self.settings_path()).unwrap_or_default()
    }

    /// Merge `patch` into the stored settings and persist the result.
    pub fn save_settings(&self, patch: SettingsPatch) -> Result<Settings, StoreError> {
        let mut settings = self.settings();
        if let Some(model) = patch.model {
            settings.model = model;
        }
        if let Some(theme) = patch.theme {
            settings.theme = theme;
        }
        self.write_json(&self.settings_path(), &settings)?;
        Ok(settings)
    }
}

impl ConversationStore for JsonFileStore {
    fn save(&self, draft: ConversationDraft) -> Result<ConversationRecord, StoreError> {
        let updated_at = match draft.updated_at {
            Some(ts) => ts,
            None => OffsetDateTime::now_utc().format(&Rfc3339)?,
        };
        let record = ConversationRecord {
            id: draft.id.unwrap_or_else(Uuid::new_v4),
            title: draft
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "New chat".to_string()),
            messages: draft.messages,
            updated_at,
        };

        let mut list = self.list();
        match list.iter().position(|c| c.id == record.id) {
            Some(index) => list[index] = record.clone(),
            None => list.insert(0, record.clone()),
        }
        list.truncate(MAX_CONVERSATIONS);

        self.write_json(&self.conversations_path(), &list)?;
        Ok(record)
    }

    fn list(&self) -> Vec<ConversationRecord> {
        Self::read_json(&self.conversations_path()).unwrap_or_default()
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let list: Vec<ConversationRecord> =
            self.list().into_iter().filter(|c| c.id != id).collect();
        self.write_json(&self.conversations_path(), &list)
    }
}
