//! Events pushed by the collection engine.

use serde::{Deserialize, Serialize};

use crate::log::Severity;
use crate::types::JobKind;

/// Asynchronous notification from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// A collection job of `kind` finished (successfully or not).
    CollectionFinished { kind: JobKind },
    /// Progress or diagnostic line for the activity log.
    LogMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        severity: Option<Severity>,
    },
}
