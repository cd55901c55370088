use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of an activity-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Classifies an unlabelled engine message by keyword, case-insensitively.
    ///
    /// Error keywords win over warning keywords, which win over success keywords.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["erro", "error"]) {
            Self::Error
        } else if has(&["aviso", "warning"]) {
            Self::Warning
        } else if has(&["sucesso", "finalizado", "salvos"]) {
            Self::Success
        } else {
            Self::Info
        }
    }

    /// Explicit severity if given, otherwise [`classify`](Self::classify).
    #[must_use]
    pub fn resolve(explicit: Option<Self>, message: &str) -> Self {
        explicit.unwrap_or_else(|| Self::classify(message))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
