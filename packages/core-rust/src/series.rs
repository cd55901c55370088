//! Managed list of configured SGS series.
//!
//! The list is edited locally (add/remove) and persisted as a whole through the
//! collection engine. Rows added since the last successful save are flagged
//! `is_unsaved`.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::messages::{SeriesConfigSnapshot, SeriesRecord};
use crate::types::Periodicity;
use crate::validators::{names, ValidatorRegistry};

/// Shown after a row is added.
pub const SERIES_ADDED_MESSAGE: &str = "Série adicionada com sucesso!";

/// Shown after the engine accepts the configuration.
pub const SERIES_SAVED_MESSAGE: &str = "Configurações salvas com sucesso!";

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static TABLE_CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]").expect("valid charset regex"));

/// Operator-facing reasons an edit or save is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    #[error("Todos os campos são obrigatórios.")]
    MissingFields,
    #[error("O código da série deve conter apenas números.")]
    InvalidCode,
    #[error("O Nome Base não deve conter palavras de período.")]
    InvalidBaseName,
    #[error("Periodicidade inválida: {0}")]
    InvalidPeriodicity(String),
    #[error("Este código de série já foi adicionado.")]
    Duplicate(String),
    #[error("Adicione pelo menos uma série antes de salvar.")]
    EmptyList,
}

/// One configured series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDefinition {
    pub code: String,
    pub table_name: String,
    /// `None` for persisted rows whose table-name suffix is not a known cadence.
    pub periodicity: Option<Periodicity>,
    /// Added since the last successful save.
    pub is_unsaved: bool,
}

impl SeriesDefinition {
    /// Periodicity as shown and saved: the known cadence, or the raw
    /// table-name suffix for unrecognised rows.
    #[must_use]
    pub fn periodicity_label(&self) -> &str {
        match self.periodicity {
            Some(periodicity) => periodicity.as_str(),
            None => table_suffix(&self.table_name),
        }
    }

    #[must_use]
    pub fn to_record(&self) -> SeriesRecord {
        SeriesRecord {
            code: self.code.clone(),
            table_name: self.table_name.clone(),
            periodicity: self.periodicity_label().to_string(),
        }
    }
}

fn table_suffix(table_name: &str) -> &str {
    table_name.rsplit('_').next().unwrap_or_default()
}

/// Lowercases, turns whitespace runs into `_` and drops anything outside
/// `[a-z0-9_]`.
#[must_use]
pub fn sanitize_table_name(base: &str) -> String {
    let lower = base.trim().to_lowercase();
    let underscored = WHITESPACE_RE.replace_all(&lower, "_");
    TABLE_CHARSET_RE.replace_all(&underscored, "").into_owned()
}

/// Destination table for `base` at `periodicity`.
#[must_use]
pub fn table_name_for(base: &str, periodicity: Periodicity) -> String {
    format!("{}_{}", sanitize_table_name(base), periodicity.as_str())
}

/// Live preview while the operator types; `None` until both inputs are usable.
#[must_use]
pub fn preview_table_name(base: &str, periodicity: &str) -> Option<String> {
    if base.trim().is_empty() {
        return None;
    }
    let periodicity = periodicity.parse::<Periodicity>().ok()?;
    Some(table_name_for(base, periodicity))
}

/// Confirmation shown before removing a row.
#[must_use]
pub fn removal_prompt(code: &str) -> String {
    format!("Tem certeza que deseja remover a série {code}?")
}

// ---------------------------------------------------------------------------
// SeriesList
// ---------------------------------------------------------------------------

/// Ordered series list, unique by code.
#[derive(Debug)]
pub struct SeriesList {
    registry: Arc<ValidatorRegistry>,
    rows: Vec<SeriesDefinition>,
}

impl SeriesList {
    #[must_use]
    pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
        Self {
            registry,
            rows: Vec::new(),
        }
    }

    /// Replaces the list with the persisted configuration, all rows saved.
    ///
    /// The periodicity is read from the table-name suffix. Every row is kept;
    /// the codes whose suffix is not a known cadence are returned so the
    /// caller can surface them.
    pub fn load(&mut self, snapshot: &SeriesConfigSnapshot) -> Vec<String> {
        self.rows.clear();
        let mut unrecognised = Vec::new();
        for (code, table_name) in &snapshot.series_codes {
            let periodicity = table_suffix(table_name).parse::<Periodicity>().ok();
            if periodicity.is_none() {
                warn!(code = %code, table = %table_name, "unrecognised periodicity suffix");
                unrecognised.push(code.clone());
            }
            self.rows.push(SeriesDefinition {
                code: code.clone(),
                table_name: table_name.clone(),
                periodicity,
                is_unsaved: false,
            });
        }
        unrecognised
    }

    /// Validates and appends a new row.
    ///
    /// # Errors
    ///
    /// Checks run in order: all fields present, code is digits, base name passes
    /// the `baseName` validator, periodicity is known, code not already listed.
    pub fn add(
        &mut self,
        code: &str,
        base_name: &str,
        periodicity: &str,
    ) -> Result<&SeriesDefinition, SeriesError> {
        let code = code.trim();
        let base_name = base_name.trim();
        let periodicity = periodicity.trim();
        if code.is_empty() || base_name.is_empty() || periodicity.is_empty() {
            return Err(SeriesError::MissingFields);
        }
        if !self.registry.validate(names::SERIES_CODE, code) {
            return Err(SeriesError::InvalidCode);
        }
        if !self.registry.validate(names::BASE_NAME, base_name) {
            return Err(SeriesError::InvalidBaseName);
        }
        let periodicity = periodicity
            .parse::<Periodicity>()
            .map_err(|_| SeriesError::InvalidPeriodicity(periodicity.to_string()))?;
        if self.contains(code) {
            return Err(SeriesError::Duplicate(code.to_string()));
        }

        let row = SeriesDefinition {
            code: code.to_string(),
            table_name: table_name_for(base_name, periodicity),
            periodicity: Some(periodicity),
            is_unsaved: true,
        };
        self.rows.push(row);
        let idx = self.rows.len() - 1;
        Ok(&self.rows[idx])
    }

    /// Removes the row for `code`. Local only until the next save.
    pub fn remove(&mut self, code: &str) -> Option<SeriesDefinition> {
        let idx = self.rows.iter().position(|r| r.code == code)?;
        Some(self.rows.remove(idx))
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.rows.iter().any(|r| r.code == code)
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&SeriesDefinition> {
        self.rows.iter().find(|r| r.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesDefinition> {
        self.rows.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn has_unsaved(&self) -> bool {
        self.rows.iter().any(|r| r.is_unsaved)
    }

    /// Whole list in the shape the engine saves.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::EmptyList`] when there is nothing to save.
    pub fn save_payload(&self) -> Result<Vec<SeriesRecord>, SeriesError> {
        if self.rows.is_empty() {
            return Err(SeriesError::EmptyList);
        }
        Ok(self.rows.iter().map(SeriesDefinition::to_record).collect())
    }

    /// Clears every `is_unsaved` flag after a successful save.
    pub fn mark_saved(&mut self) {
        for row in &mut self.rows {
            row.is_unsaved = false;
        }
    }
}
