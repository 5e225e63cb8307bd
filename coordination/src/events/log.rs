//! Log entries returned to the caller alongside the consensus.

use serde::{Deserialize, Serialize};

/// Pipeline role that produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRole {
    Nexus,
    Relay,
    Sentinel,
}

impl std::fmt::Display for LogRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nexus => write!(f, "nexus"),
            Self::Relay => write!(f, "relay"),
            Self::Sentinel => write!(f, "sentinel"),
        }
    }
}

/// Category of a log entry, serialized as the entry's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Genesis,
    Info,
    Fragment,
    Warning,
    Error,
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub agent: LogRole,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

impl LogEntry {
    pub fn new(agent: LogRole, kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            agent,
            message: message.into(),
            kind,
        }
    }
}

/// Append-only log of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, agent: LogRole, kind: LogKind, message: impl Into<String>) {
        self.entries.push(LogEntry::new(agent, kind, message));
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        self.entries.extend(entries);
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
