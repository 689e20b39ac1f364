use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: String,
    pub message: String,
}

impl ErrorLogEntry {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorLogEntry {
            timestamp: Local::now(),
            kind: kind.into(),
            message: message.into(),
        }
    }

    fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Diagnostic channel for failed fetches and renders, one JSON object per line.
#[derive(Clone, Debug)]
pub struct ErrorLogStore {
    path: PathBuf,
}

impl ErrorLogStore {
    pub fn new(path: PathBuf) -> Self {
        ErrorLogStore { path }
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("error_logs.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_message(&self, kind: &str, message: impl Into<String>) -> Result<()> {
        let entry = ErrorLogEntry::new(kind, message);
        self.append(&entry)
    }

    fn append(&self, entry: &ErrorLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, &StoredErrorLogEntry::from(entry))?;
        file.write_all(b"\n")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn load_entries(&self) -> Result<Vec<StoredErrorLogEntry>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut entries = Vec::new();
        for line in contents.lines().filter(|line| !line.trim().is_empty()) {
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredErrorLogEntry {
    pub timestamp_ms: i64,
    pub kind: String,
    pub message: String,
}

impl From<&ErrorLogEntry> for StoredErrorLogEntry {
    fn from(entry: &ErrorLogEntry) -> Self {
        StoredErrorLogEntry {
            timestamp_ms: entry.timestamp_ms(),
            kind: entry.kind.clone(),
            message: entry.message.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn temp_log_path(name: &str) -> PathBuf {
    let unique = format!(
        "prediction-view-{}-{}-{}",
        name,
        std::process::id(),
        Local::now().timestamp_nanos_opt().unwrap_or_default()
    );
    std::env::temp_dir().join(unique).join("error_logs.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_load() {
        let store = ErrorLogStore::new(temp_log_path("append"));
        assert!(store.load_entries().unwrap().is_empty());
        store.append_message("network", "Network response was not ok. Status: 500").unwrap();
        store.append_message("validation", "Invalid data format").unwrap();
        let entries = store.load_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "network");
        assert_eq!(entries[1].message, "Invalid data format");
        assert!(entries[0].timestamp_ms <= entries[1].timestamp_ms);
        let _ = fs::remove_dir_all(store.path().parent().unwrap());
    }
}
