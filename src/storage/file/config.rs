//! File-based configuration storage.
//!
//! One JSON file per sequence under `configs/{scope}/{name}.json`. Writes go to a
//! temporary file first and are then renamed (replace) or hard-linked
//! (insert-if-absent) into place, so readers never see a partial file.

use std::path::{Path, PathBuf};

use crate::domain::{SequenceConfig, SequenceKey};
use crate::error::StorageResult;

use super::sanitize_name;

/// File-based configuration storage implementation.
pub struct FileConfigStorage {
    /// Base directory for configs.
    configs_dir: PathBuf,
}

impl FileConfigStorage {
    /// Create a new file config storage.
    #[must_use]
    pub const fn new(configs_dir: PathBuf) -> Self {
        Self { configs_dir }
    }

    fn scope_dir(&self, scope_id: &str) -> PathBuf {
        self.configs_dir.join(sanitize_name(scope_id))
    }

    fn config_path(&self, key: &SequenceKey) -> PathBuf {
        self.scope_dir(&key.scope_id)
            .join(format!("{}.json", sanitize_name(&key.sequence_name)))
    }

    /// Write `config` to a fresh temporary file next to its final path.
    fn write_temp(&self, config: &SequenceConfig) -> StorageResult<(PathBuf, PathBuf)> {
        let path = self.config_path(&config.key());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        std::fs::write(&temp, serde_json::to_vec_pretty(config)?)?;
        Ok((temp, path))
    }

    /// Create or replace a configuration.
    ///
    /// The file is replaced whole; callers carry `created_at` over themselves.
    pub fn save(&self, config: &SequenceConfig) -> StorageResult<()> {
        let (temp, path) = self.write_temp(config)?;
        if let Err(e) = std::fs::rename(&temp, &path) {
            let _ = std::fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Insert a configuration unless one exists.
    ///
    /// Returns `None` when `config` was linked into place, otherwise the stored
    /// configuration.
    pub fn insert_if_absent(&self, config: &SequenceConfig) -> StorageResult<Option<SequenceConfig>> {
        let (temp, path) = self.write_temp(config)?;

        let result = loop {
            match std::fs::hard_link(&temp, &path) {
                Ok(()) => break Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => match load(&path) {
                    Ok(Some(existing)) => break Ok(Some(existing)),
                    // Deleted between the link and the read.
                    Ok(None) => {}
                    Err(e) => break Err(e),
                },
                Err(e) => break Err(e.into()),
            }
        };

        let _ = std::fs::remove_file(&temp);
        result
    }

    /// Load a configuration by key.
    pub fn get(&self, key: &SequenceKey) -> StorageResult<Option<SequenceConfig>> {
        load(&self.config_path(key))
    }

    /// List all configurations of a scope, sorted by name.
    pub fn list(&self, scope_id: &str) -> StorageResult<Vec<SequenceConfig>> {
        let dir = self.scope_dir(scope_id);

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut configs = Vec::new();

        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                match load(&path) {
                    Ok(Some(config)) => configs.push(config),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Failed to parse config file");
                    }
                }
            }
        }

        configs.sort_by(|a: &SequenceConfig, b| a.sequence_name.cmp(&b.sequence_name));
        Ok(configs)
    }

    /// Delete a configuration. Returns whether it existed.
    pub fn delete(&self, key: &SequenceKey) -> StorageResult<bool> {
        match std::fs::remove_file(self.config_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn load(path: &Path) -> StorageResult<Option<SequenceConfig>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn config(scope: &str, name: &str, pattern: &str) -> SequenceConfig {
        let key = SequenceKey::new(scope, name).unwrap();
        SequenceConfig::new(&key, pattern, Utc::now())
    }

    #[test]
    fn test_save_get_replace() {
        let temp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(temp.path().to_path_buf());

        let mut c = config("acme", "invoice", "INV-{COUNTER}");
        storage.save(&c).unwrap();
        assert_eq!(storage.get(&c.key()).unwrap(), Some(c.clone()));

        c.pattern = "INV-{YEAR}-{COUNTER:4}".to_string();
        storage.save(&c).unwrap();
        assert_eq!(
            storage.get(&c.key()).unwrap().unwrap().pattern,
            "INV-{YEAR}-{COUNTER:4}"
        );
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let temp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(temp.path().to_path_buf());

        let first = config("acme", "po", "PO-{COUNTER}");
        let second = config("acme", "po", "OTHER-{COUNTER}");

        assert!(storage.insert_if_absent(&first).unwrap().is_none());
        let stored = storage.insert_if_absent(&second).unwrap().unwrap();
        assert_eq!(stored.pattern, "PO-{COUNTER}");

        // No temporary files left behind.
        let entries = std::fs::read_dir(temp.path().join("acme")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_list_is_scoped_and_sorted() {
        let temp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(temp.path().to_path_buf());

        storage.save(&config("acme", "po", "{COUNTER}")).unwrap();
        storage.save(&config("acme", "invoice", "{COUNTER}")).unwrap();
        storage.save(&config("globex", "invoice", "{COUNTER}")).unwrap();

        let names: Vec<String> = storage
            .list("acme")
            .unwrap()
            .into_iter()
            .map(|c| c.sequence_name)
            .collect();
        assert_eq!(names, vec!["invoice", "po"]);
        assert!(storage.list("initech").unwrap().is_empty());
    }

    #[test]
    fn test_delete() {
        let temp = TempDir::new().unwrap();
        let storage = FileConfigStorage::new(temp.path().to_path_buf());

        let c = config("acme", "invoice", "{COUNTER}");
        storage.save(&c).unwrap();
        assert!(storage.delete(&c.key()).unwrap());
        assert!(!storage.delete(&c.key()).unwrap());
        assert!(storage.get(&c.key()).unwrap().is_none());
    }
}
