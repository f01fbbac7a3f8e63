//! File-based history: JSON lines, append only.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{AuditEntry, GeneratedNumber};
use crate::error::StorageResult;

use super::sanitize_name;

/// Appends generated numbers to `history/{scope}/{name}.jsonl` and audit
/// entries to `audit.jsonl`.
pub struct FileHistoryStorage {
    /// Base data directory.
    base_dir: PathBuf,
}

impl FileHistoryStorage {
    /// Create a new file history storage.
    #[must_use]
    pub const fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Append one generated number.
    pub fn record_generated(&self, number: &GeneratedNumber) -> StorageResult<()> {
        let path = self
            .base_dir
            .join("history")
            .join(sanitize_name(&number.metadata.scope_id))
            .join(format!("{}.jsonl", sanitize_name(&number.metadata.sequence_name)));
        append_line(&path, number)
    }

    /// Append one audit entry.
    pub fn record_audit(&self, entry: &AuditEntry) -> StorageResult<()> {
        append_line(&self.base_dir.join("audit.jsonl"), entry)
    }
}

/// Append `value` as one JSON line with a single write.
fn append_line<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(&line)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuditAction, SequenceKey};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_history_lines() {
        let temp = TempDir::new().unwrap();
        let storage = FileHistoryStorage::new(temp.path().to_path_buf());
        let key = SequenceKey::new("acme", "invoice").unwrap();

        for counter in 1..=3 {
            let number = GeneratedNumber::new(&key, format!("INV-{counter}"), counter, Utc::now(), None);
            storage.record_generated(&number).unwrap();
        }

        let text =
            std::fs::read_to_string(temp.path().join("history/acme/invoice.jsonl")).unwrap();
        let lines: Vec<GeneratedNumber> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].value, "INV-3");
    }

    #[test]
    fn test_audit_lines() {
        let temp = TempDir::new().unwrap();
        let storage = FileHistoryStorage::new(temp.path().to_path_buf());
        let key = SequenceKey::new("acme", "invoice").unwrap();

        let entry = AuditEntry::new(AuditAction::Override, &key, "admin", "migration", Utc::now())
            .with_values(10, 500);
        storage.record_audit(&entry).unwrap();

        let text = std::fs::read_to_string(temp.path().join("audit.jsonl")).unwrap();
        let parsed: AuditEntry = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed, entry);
    }
}
