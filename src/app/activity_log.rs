use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Status,
    Connection,
    KeyEvent,
    Upload,
    Download,
    CustomCommand,
    Devices,
    Tool,
}

impl EntryKind {
    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Status => "ADB Status",
            EntryKind::Connection => "Connection Output",
            EntryKind::KeyEvent => "Sent Key Event",
            EntryKind::Upload => "Upload Output",
            EntryKind::Download => "Download Output",
            EntryKind::CustomCommand => "Custom Command Output",
            EntryKind::Devices => "Devices",
            EntryKind::Tool => "ADB Check",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub kind: EntryKind,
    pub text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.at.format("%H:%M:%S"),
            self.kind.label(),
            self.text
        )
    }
}

/// Append-only record of what the shell did. A non-zero capacity drops the oldest entries.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, kind: EntryKind, text: impl Into<String>) -> &LogEntry {
        if self.capacity > 0 && self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: Local::now(),
            kind,
            text: text.into(),
        });
        // Just pushed.
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{entry}\n"))
            .collect()
    }
}
