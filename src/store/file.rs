//! JSON file snapshot of active form sessions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::traits::SessionStore;
use crate::error::StoreError;
use crate::form::FormSession;

/// Writes the whole session table to one JSON file after every mutation.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
pub struct JsonFileSessionStore {
    path: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "sessions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn load_all(&self) -> Result<HashMap<String, FormSession>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let sessions: HashMap<String, FormSession> = serde_json::from_str(&raw)?;
        debug!(count = sessions.len(), path = %self.path.display(), "Loaded form sessions");
        Ok(sessions)
    }

    async fn save_all(&self, sessions: &HashMap<String, FormSession>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(sessions)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Language;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("none.json"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_preserves_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("nested/forms.json"));

        let mut session = FormSession::new("u1", Some("E1".into()), Language::En, "full_name");
        session.record("language", serde_json::json!("en"));
        session.record("interested_in_event_types", serde_json::json!(["play", "cuddle"]));
        session.registration_id = Some("R1".into());

        let mut table = HashMap::new();
        table.insert("u1".to_string(), session);
        store.save_all(&table).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        let restored = &loaded["u1"];
        assert_eq!(restored.current_question, "full_name");
        assert_eq!(restored.language, Language::En);
        assert_eq!(restored.registration_id.as_deref(), Some("R1"));
        assert_eq!(restored.answers["interested_in_event_types"][1], "cuddle");
        // Insertion order survives the round trip
        let keys: Vec<_> = restored.answers.keys().cloned().collect();
        assert_eq!(keys, vec!["language", "interested_in_event_types"]);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forms.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let store = JsonFileSessionStore::new(&path);
        assert!(matches!(
            store.load_all().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
