// Assistant records and their flat-file store
//
// Assistants persist as a JSON array in one file per user, rewritten
// wholesale on every save. There is no locking; concurrent writers can
// clobber each other and the behavior is undefined. Loads are tolerant:
// a missing or corrupt file reads as an empty store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Knowledge-base text is truncated to this many characters at creation.
pub const KNOWLEDGE_BASE_LIMIT: usize = 5000;

/// Separator between the system prompt and the appended knowledge base.
pub const KNOWLEDGE_BASE_SEPARATOR: &str = "\n\n**Knowledge Base Context:**\n";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access assistant store: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode assistant store: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid assistant record: missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssistantStatus {
    Active,
    Draft,
}

/// One configured assistant: a name, a system prompt, and optional raw
/// knowledge text that gets stuffed into the prompt at chat time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub knowledge_base: String,
    #[serde(default = "default_status")]
    pub status: AssistantStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> AssistantStatus {
    AssistantStatus::Active
}

impl Assistant {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        knowledge_base: impl Into<String>,
    ) -> Self {
        let knowledge_base: String = knowledge_base
            .into()
            .chars()
            .take(KNOWLEDGE_BASE_LIMIT)
            .collect();

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            knowledge_base,
            status: AssistantStatus::Active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// System prompt with the knowledge base appended; this is what the
    /// chat surface hands to the generation entry point. The knowledge base
    /// is never sent as its own conversation turn.
    pub fn effective_system_prompt(&self) -> String {
        if self.knowledge_base.is_empty() {
            self.system_prompt.clone()
        } else {
            format!(
                "{}{}{}",
                self.system_prompt, KNOWLEDGE_BASE_SEPARATOR, self.knowledge_base
            )
        }
    }

    /// Case-insensitive substring match against name and description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct AssistantStore {
    path: PathBuf,
}

impl AssistantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file for the given user: `{username}_assistants.json` with the
    /// username lowercased, or plain `assistants.json` when it is empty.
    pub fn for_user(dir: impl AsRef<Path>, username: &str) -> Self {
        let file = if username.is_empty() {
            "assistants.json".to_string()
        } else {
            format!("{}_assistants.json", username.to_lowercase())
        };
        Self::new(dir.as_ref().join(file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. Missing or unreadable files read as empty.
    pub fn load(&self) -> Vec<Assistant> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str(&contents) {
            Ok(assistants) => assistants,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "corrupt assistant store: {e}");
                Vec::new()
            }
        }
    }

    /// Rewrite the whole file with the given records, pretty-printed.
    pub fn save(&self, assistants: &[Assistant]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(assistants)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn add(&self, assistant: Assistant) -> Result<(), StoreError> {
        let mut assistants = self.load();
        assistants.push(assistant);
        self.save(&assistants)
    }

    /// Remove by id. True when a record was actually deleted.
    pub fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut assistants = self.load();
        let before = assistants.len();
        assistants.retain(|a| a.id != id);
        let removed = assistants.len() != before;
        if removed {
            self.save(&assistants)?;
        }
        Ok(removed)
    }

    /// Import a previously exported record and append it to the store.
    ///
    /// `name`, `description`, and `system_prompt` are required; a missing
    /// `id`, `created_at`, or `status` is filled in.
    pub fn import(&self, json: &str) -> Result<Assistant, StoreError> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;

        for field in ["name", "description", "system_prompt"] {
            if value.get(field).and_then(|v| v.as_str()).is_none() {
                return Err(StoreError::MissingField(field));
            }
        }

        // The required-field check above guarantees an object.
        if let Some(object) = value.as_object_mut() {
            if !object.contains_key("id") {
                object.insert("id".to_string(), serde_json::json!(Uuid::new_v4()));
            }
            if !object.contains_key("created_at") {
                object.insert("created_at".to_string(), serde_json::json!(Utc::now()));
            }
            if !object.contains_key("status") {
                object.insert("status".to_string(), serde_json::json!("Active"));
            }
        }

        let assistant: Assistant = serde_json::from_value(value)?;
        self.add(assistant.clone())?;
        Ok(assistant)
    }

    /// Pretty JSON for download/export of one record.
    pub fn export(assistant: &Assistant) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(assistant)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_truncates_knowledge_base() {
        let long = "x".repeat(KNOWLEDGE_BASE_LIMIT + 100);
        let assistant = Assistant::new("A", "d", "sp", long);
        assert_eq!(assistant.knowledge_base.chars().count(), KNOWLEDGE_BASE_LIMIT);
    }

    #[test]
    fn test_effective_system_prompt_appends_knowledge() {
        let assistant = Assistant::new("A", "d", "You are A.", "facts here");
        let prompt = assistant.effective_system_prompt();
        assert!(prompt.starts_with("You are A."));
        assert!(prompt.contains(KNOWLEDGE_BASE_SEPARATOR));
        assert!(prompt.ends_with("facts here"));
    }

    #[test]
    fn test_effective_system_prompt_without_knowledge() {
        let assistant = Assistant::new("A", "d", "You are A.", "");
        assert_eq!(assistant.effective_system_prompt(), "You are A.");
    }

    #[test]
    fn test_matches_search_is_case_insensitive() {
        let assistant = Assistant::new("Recipe Helper", "cooking ideas", "sp", "");
        assert!(assistant.matches_search("recipe"));
        assert!(assistant.matches_search("COOKING"));
        assert!(!assistant.matches_search("gardening"));
    }

    #[test]
    fn test_per_user_file_naming() {
        let store = AssistantStore::for_user("/tmp", "Alice");
        assert!(store.path().ends_with("alice_assistants.json"));

        let store = AssistantStore::for_user("/tmp", "");
        assert!(store.path().ends_with("assistants.json"));
    }

    #[test]
    fn test_status_serializes_capitalized() {
        let json = serde_json::to_value(AssistantStatus::Draft).unwrap();
        assert_eq!(json, "Draft");
    }
}
