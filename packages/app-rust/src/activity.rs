//! Operator-visible activity log.
//!
//! A bounded, timestamped list of messages shown in the control panel. Every
//! entry is also emitted through `tracing` at the matching level.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use coletor_core::Severity;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};

/// Logged after the log is cleared.
pub const CLEARED_MESSAGE: &str = "Logs limpos.";

/// One line of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Shared, bounded activity log. Cloning shares the same buffer.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl ActivityLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    /// Appends a message, dropping the oldest entry when full.
    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => error!(target: "coletor::activity", "{message}"),
            Severity::Warning => warn!(target: "coletor::activity", "{message}"),
            Severity::Info | Severity::Success => {
                info!(target: "coletor::activity", severity = %severity, "{message}");
            }
        }
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            timestamp: Local::now(),
            severity,
            message,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Appends an engine message, classifying it when no severity was given.
    pub fn engine(&self, message: &str, severity: Option<Severity>) {
        self.push(Severity::resolve(severity, message), message);
    }

    /// Empties the log, leaving only the cleared notice.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.info(CLEARED_MESSAGE);
    }

    /// Snapshot of the current entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<LogEntry> {
        self.entries.read().back().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
