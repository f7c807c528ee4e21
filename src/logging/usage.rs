// Append-only usage log
//
// One line per tracked action: `{timestamp} | {action} | {details}`.
// Appends are fire-and-forget; logging must never break the caller.

use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A parsed usage log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    pub timestamp: String,
    pub action: String,
    pub details: String,
}

/// Append-only action log backed by one text file.
#[derive(Debug, Clone)]
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one action line. Failures are logged and swallowed.
    pub fn record(&self, action: &str, details: &str) {
        if let Err(e) = self.append(action, details) {
            tracing::warn!(path = %self.path.display(), "failed to append usage log: {e}");
        }
    }

    fn append(&self, action: &str, details: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        writeln!(file, "{timestamp} | {action} | {details}")
    }

    /// Read the log back. Malformed lines are skipped; any read failure
    /// yields an empty list.
    pub fn entries(&self) -> Vec<UsageEntry> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };

        contents
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, " | ");
                Some(UsageEntry {
                    timestamp: parts.next()?.to_string(),
                    action: parts.next()?.to_string(),
                    details: parts.next()?.to_string(),
                })
            })
            .collect()
    }
}
