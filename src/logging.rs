use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::paths;

/// One users request, as written to the debug request log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub query: String,
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(url: &str, query: &str, elapsed: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            method: "GET".to_string(),
            url: url.to_string(),
            query: query.to_string(),
            status: None,
            duration_ms: elapsed.as_millis().try_into().unwrap_or(u64::MAX),
            success: false,
            error: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self.success = (200..300).contains(&status);
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self.success = false;
        self
    }
}

/// Appends request records as JSON lines.
///
/// Nothing is written unless debug mode is on, so the TUI never has to share
/// the terminal with log output.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    log_file: PathBuf,
    always: bool,
}

impl RequestLogger {
    pub fn new() -> Result<Self> {
        let log_dir = paths::logs_dir()?;
        Ok(Self {
            log_file: log_dir.join("requests.jsonl"),
            always: false,
        })
    }

    /// Logger writing to an explicit file regardless of debug mode
    pub fn to_file(log_file: PathBuf) -> Self {
        Self {
            log_file,
            always: true,
        }
    }

    fn enabled(&self) -> bool {
        self.always || crate::ui::is_debug_enabled()
    }

    pub fn log(&self, entry: &RequestLog) -> Result<()> {
        if !self.enabled() {
            return Ok(());
        }

        if let Some(parent) = self.log_file.parent() {
            create_dir_all(parent).context("Failed to create request log directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .context("Failed to open request log file")?;

        let json_line =
            serde_json::to_string(entry).context("Failed to serialize request log entry")?;

        writeln!(file, "{json_line}").context("Failed to write to request log file")?;

        Ok(())
    }

    /// Read back every entry, skipping lines that fail to parse
    pub fn read_entries(&self) -> Result<Vec<RequestLog>> {
        if !self.log_file.exists() {
            return Ok(Vec::new());
        }

        let contents =
            std::fs::read_to_string(&self.log_file).context("Failed to read request log file")?;

        Ok(contents
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_appended_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RequestLogger::to_file(dir.path().join("logs").join("requests.jsonl"));

        let ok = RequestLog::new("http://panel/api/application/users", "page=2", Duration::from_millis(42))
            .with_status(200);
        let failed = RequestLog::new("http://panel/api/application/users", "", Duration::from_millis(7))
            .with_error("Network error: connection refused");

        logger.log(&ok).unwrap();
        logger.log(&failed).unwrap();

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert_eq!(entries[0].status, Some(200));
        assert_eq!(entries[0].duration_ms, 42);
        assert_eq!(entries[0].query, "page=2");
        assert!(!entries[1].success);
        assert_eq!(
            entries[1].error.as_deref(),
            Some("Network error: connection refused")
        );
    }

    #[test]
    fn test_error_status_is_not_success() {
        let entry = RequestLog::new("u", "", Duration::ZERO).with_status(500);
        assert!(!entry.success);
    }
}
