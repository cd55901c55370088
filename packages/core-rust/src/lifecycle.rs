//! Collection lifecycle state machine.
//!
//! One shared slot gates both job kinds: while any job runs, every start
//! request is ignored, and only the engine's completion signal frees the slot.
//! The transitions here are pure; the application wraps them in an atomic
//! controller.

use std::fmt;

use serde::Serialize;

use crate::types::JobKind;

/// Logged when a series collection is dispatched.
pub const SERIES_STARTED_MESSAGE: &str = "Iniciando processo de coleta...";

/// Logged when a bulletin collection is dispatched.
pub const BULLETIN_STARTED_MESSAGE: &str = "Iniciando processo de coleta do Boletim Focus...";

/// Logged when the completion signal returns the slot to idle.
pub const FINISHED_MESSAGE: &str = "Processo de coleta finalizado.";

/// Confirmation required to leave while a job runs.
pub const EXIT_CONFIRMATION: &str = "Uma coleta está em andamento. Tem certeza que deseja sair?";

/// Lifecycle of the single collection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Running(JobKind),
}

/// A start request was refused because a job already holds the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("collection already running: {running}")]
pub struct Busy {
    pub running: JobKind,
}

impl LifecycleState {
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running(_))
    }

    #[must_use]
    pub fn running_kind(self) -> Option<JobKind> {
        match self {
            Self::Idle => None,
            Self::Running(kind) => Some(kind),
        }
    }

    /// `Idle -> Running(kind)`.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] when a job is already running; the state is unchanged.
    pub fn start(self, kind: JobKind) -> Result<Self, Busy> {
        match self {
            Self::Idle => Ok(Self::Running(kind)),
            Self::Running(running) => Err(Busy { running }),
        }
    }

    /// `Running(_) -> Idle`; `None` when already idle.
    #[must_use]
    pub fn complete(self) -> Option<Self> {
        self.is_running().then_some(Self::Idle)
    }

    /// Whether the operator may leave without confirmation.
    #[must_use]
    pub fn exit_decision(self) -> ExitDecision {
        if self.is_running() {
            ExitDecision::Confirm(EXIT_CONFIRMATION)
        } else {
            ExitDecision::Allow
        }
    }

    #[must_use]
    pub fn affordances(self) -> BusyAffordances {
        BusyAffordances::for_state(self)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running(kind) => write!(f, "running({kind})"),
        }
    }
}

/// Exit request outcome. Never changes the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Allow,
    /// Ask the operator with this message before leaving.
    Confirm(&'static str),
}

/// What the start controls look like in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyAffordances {
    pub start_enabled: bool,
    pub overlay_visible: bool,
    pub series_button_label: &'static str,
    pub bulletin_button_label: &'static str,
}

impl BusyAffordances {
    pub const BUSY_LABEL: &'static str = "Coletando...";
    pub const SERIES_LABEL: &'static str = "Iniciar Coleta Séries Temporais";
    pub const BULLETIN_LABEL: &'static str = "Iniciar Coleta Boletim Focus";

    #[must_use]
    pub fn for_state(state: LifecycleState) -> Self {
        if state.is_running() {
            Self {
                start_enabled: false,
                overlay_visible: true,
                series_button_label: Self::BUSY_LABEL,
                bulletin_button_label: Self::BUSY_LABEL,
            }
        } else {
            Self {
                start_enabled: true,
                overlay_visible: false,
                series_button_label: Self::SERIES_LABEL,
                bulletin_button_label: Self::BULLETIN_LABEL,
            }
        }
    }
}
