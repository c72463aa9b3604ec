//! Session discovery and persistence

use super::snapshot::{self, DecodeFailure};
use super::store::ChatHistory;
use crate::config::schema::ChatConfig;
use crate::error::{ExportError, LoadError, SaveError, StoreError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Finds, loads and writes session files in one directory
#[derive(Debug, Clone)]
pub struct SessionManager {
    /// Directory scanned for sessions and used for saves
    sessions_dir: PathBuf,
    /// Snapshot extension without the dot
    session_extension: String,
    /// JSON export extension without the dot
    export_extension: String,
}

impl SessionManager {
    /// Create a manager using the default `cht` / `json` extensions
    pub fn new<P: AsRef<Path>>(sessions_dir: P) -> Self {
        Self::from_config(sessions_dir, &ChatConfig::default())
    }

    pub fn from_config<P: AsRef<Path>>(sessions_dir: P, config: &ChatConfig) -> Self {
        Self {
            sessions_dir: sessions_dir.as_ref().to_path_buf(),
            session_extension: config.session_extension.clone(),
            export_extension: config.export_extension.clone(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// File names in the sessions directory that are snapshots.
    ///
    /// Only regular files whose extension matches exactly are returned, in
    /// directory-listing order. An empty list is not an error.
    pub fn list_sessions(&self) -> crate::Result<Vec<String>> {
        let mut sessions = Vec::new();

        for entry in std::fs::read_dir(&self.sessions_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == self.session_extension);
            if !matches {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                sessions.push(name.to_string());
            }
        }

        debug!(
            "Found {} session file(s) in {}",
            sessions.len(),
            self.sessions_dir.display()
        );
        Ok(sessions)
    }

    /// Restore a history from a binary snapshot
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ChatHistory, LoadError> {
        let path = self.resolve(path.as_ref());
        let bytes = std::fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        let history = snapshot::decode(&bytes).map_err(|failure| match failure {
            DecodeFailure::Mismatch(reason) => StoreError::FormatMismatch {
                path: path.clone(),
                reason,
            },
            DecodeFailure::Corrupt(reason) => StoreError::Corrupt {
                path: path.clone(),
                reason,
            },
        })?;
        info!("Loaded {} turn(s) from {}", history.len(), path.display());
        Ok(history)
    }

    /// Write a binary snapshot of the history
    pub fn save_binary(
        &self,
        path: impl AsRef<Path>,
        history: &ChatHistory,
    ) -> Result<PathBuf, SaveError> {
        let path = self.resolve(path.as_ref());
        let bytes = snapshot::encode(history).map_err(|e| StoreError::Encode(e.to_string()))?;
        std::fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))?;
        info!("Saved {} turn(s) to {}", history.len(), path.display());
        Ok(path)
    }

    /// Write the history as an indented JSON array, one object per turn
    pub fn export_json(
        &self,
        path: impl AsRef<Path>,
        history: &ChatHistory,
    ) -> Result<PathBuf, ExportError> {
        let path = self.resolve(path.as_ref());
        let records = history
            .to_json_records()
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        let content =
            serde_json::to_string_pretty(&records).map_err(|e| StoreError::Encode(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| StoreError::io(&path, e))?;
        info!("Exported {} turn(s) to {}", history.len(), path.display());
        Ok(path)
    }

    /// Save under a user-chosen name, appending the snapshot extension
    pub fn save_named(&self, name: &str, history: &ChatHistory) -> Result<PathBuf, SaveError> {
        let file_name = self.file_name(name, &self.session_extension)?;
        self.save_binary(file_name, history)
    }

    /// Export under a user-chosen name, appending the export extension
    pub fn export_named(&self, name: &str, history: &ChatHistory) -> Result<PathBuf, ExportError> {
        let file_name = self.file_name(name, &self.export_extension)?;
        self.export_json(file_name, history)
    }

    fn file_name(&self, name: &str, extension: &str) -> Result<String, StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(format!("{}.{}", name, extension))
    }

    /// Relative paths are taken from the sessions directory
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.sessions_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::ChatTurn;
    use tempfile::TempDir;

    fn sample_history() -> ChatHistory {
        ChatHistory::from(vec![
            ChatTurn::user("Hello"),
            ChatTurn::model("Hi! How can I help?"),
            ChatTurn::user("Tell me a joke"),
            ChatTurn::model("Why did the crab never share? Because it was shellfish."),
        ])
    }

    #[test]
    fn test_empty_directory_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        assert!(manager.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_list_only_regular_cht_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("a.cht"), b"").unwrap();
        std::fs::write(root.join("b.cht"), b"").unwrap();
        std::fs::write(root.join("notes.json"), b"").unwrap();
        std::fs::write(root.join("c.cht.bak"), b"").unwrap();
        std::fs::write(root.join("cht"), b"").unwrap();
        std::fs::create_dir(root.join("folder.cht")).unwrap();

        let manager = SessionManager::new(root);
        let mut sessions = manager.list_sessions().unwrap();
        sessions.sort();

        assert_eq!(sessions, vec!["a.cht".to_string(), "b.cht".to_string()]);
    }

    #[test]
    fn test_list_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path().join("absent"));
        assert!(matches!(
            manager.list_sessions().unwrap_err(),
            crate::Error::Io(_)
        ));
    }

    #[test]
    fn test_save_and_load_session() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        let history = sample_history();

        manager.save_binary("chat.cht", &history).unwrap();
        let loaded = manager.load("chat.cht").unwrap();

        assert_eq!(loaded, history);
    }

    #[test]
    fn test_save_named_appends_extension() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());

        let path = manager.save_named("foo", &sample_history()).unwrap();

        assert_eq!(path, temp_dir.path().join("foo.cht"));
        assert!(path.is_file());
        assert_eq!(manager.list_sessions().unwrap(), vec!["foo.cht".to_string()]);
        assert_eq!(manager.load("foo.cht").unwrap(), sample_history());
    }

    #[test]
    fn test_save_named_rejects_empty_name() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        let err = manager.save_named("", &sample_history()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        let err = manager.load("nope.cht").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_load_foreign_file_is_format_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("old.cht"), b"not a snapshot").unwrap();
        let manager = SessionManager::new(temp_dir.path());

        let err = manager.load("old.cht").unwrap_err();
        assert!(matches!(err, StoreError::FormatMismatch { .. }));
        assert!(!err.is_io());
    }

    #[test]
    fn test_save_into_missing_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path().join("absent"));
        let err = manager.save_named("foo", &sample_history()).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_export_json_is_ordered_array() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        let history = sample_history();

        let path = manager.export_named("dump", &history).unwrap();
        assert_eq!(path, temp_dir.path().join("dump.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), history.len());
        for (item, turn) in items.iter().zip(history.iter()) {
            assert_eq!(item["role"], turn.role.as_str());
            assert_eq!(item["parts"][0]["text"], turn.parts[0].text.as_str());
        }
    }

    #[test]
    fn test_export_json_format() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        let history = ChatHistory::from(vec![ChatTurn::user("こんにちは")]);

        let path = manager.export_named("jp", &history).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();

        assert!(raw.contains("こんにちは"));
        assert!(raw.starts_with("[\n  {\n    \""));
    }

    #[test]
    fn test_export_is_not_listed_as_session() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SessionManager::new(temp_dir.path());
        manager.export_named("dump", &sample_history()).unwrap();
        assert!(manager.list_sessions().unwrap().is_empty());
    }
}
