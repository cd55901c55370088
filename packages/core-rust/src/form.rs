//! Bulletin filter form.
//!
//! A [`BulletinForm`] lives for one settings activation. The start/end dates are
//! created with it and keep their values across endpoint switches; the
//! endpoint-specific block is a [`FilterFormState`] rebuilt from the catalog on
//! every selection and dropped whole when the selection changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::catalog::EndpointCatalog;
use crate::messages::{BulletinRequest, FilterSet, SavedBulletinFilters};
use crate::schema::{
    end_date_field, start_date_field, FieldDescriptor, END_DATE_FIELD, START_DATE_FIELD,
};
use crate::validation::{FieldError, ValidationController};
use crate::validators::ValidatorRegistry;

/// Shown in place of the endpoint block when nothing valid is selected.
pub const SELECT_ENDPOINT_MESSAGE: &str = "Selecione um endpoint para ver os filtros disponíveis.";

/// Shown when the selected endpoint has no filters of its own.
pub const NO_FILTERS_MESSAGE: &str = "Nenhum filtro adicional disponível para este endpoint.";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An input without which no request can be composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MissingInput {
    Endpoint,
    StartDate,
}

impl MissingInput {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Endpoint => "Endpoint",
            Self::StartDate => "Data de Início",
        }
    }
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Endpoint and/or start date are missing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Preencha os campos obrigatórios: {}", join_labels(.missing))]
pub struct PreconditionError {
    pub missing: Vec<MissingInput>,
}

fn join_labels(missing: &[MissingInput]) -> String {
    missing
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a submit produced no request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    /// At least one field failed validation; `first_field` should take focus.
    #[error("campo inválido: {first_field}")]
    Invalid { first_field: String },
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Endpoint block produced by a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RenderedForm {
    Placeholder {
        message: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Endpoint {
        key: String,
        display_name: String,
        description: String,
        tooltip: String,
        /// Validators are already attached to every field listed here.
        fields: Vec<FieldDescriptor>,
        #[serde(skip_serializing_if = "Option::is_none")]
        empty_message: Option<&'static str>,
    },
}

impl RenderedForm {
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }

    /// Rendered endpoint fields; empty for the placeholder.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        match self {
            Self::Placeholder { .. } => &[],
            Self::Endpoint { fields, .. } => fields,
        }
    }
}

/// Values and validation state of the endpoint-specific block.
#[derive(Debug)]
pub struct FilterFormState {
    endpoint_key: String,
    fields: Vec<FieldDescriptor>,
    values: HashMap<String, String>,
    validation: ValidationController,
}

impl FilterFormState {
    #[must_use]
    pub fn endpoint_key(&self) -> &str {
        &self.endpoint_key
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn error(&self, field: &str) -> Option<&FieldError> {
        self.validation.error(field)
    }

    fn owns(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.id == field)
    }
}

// ---------------------------------------------------------------------------
// BulletinForm
// ---------------------------------------------------------------------------

/// Date fields plus the active endpoint block for one settings activation.
#[derive(Debug)]
pub struct BulletinForm {
    registry: Arc<ValidatorRegistry>,
    catalog: Arc<EndpointCatalog>,
    debounce: Duration,
    date_fields: Vec<FieldDescriptor>,
    date_values: HashMap<String, String>,
    dates: ValidationController,
    active: Option<FilterFormState>,
}

impl BulletinForm {
    #[must_use]
    pub fn new(
        registry: Arc<ValidatorRegistry>,
        catalog: Arc<EndpointCatalog>,
        debounce: Duration,
    ) -> Self {
        let date_fields = vec![start_date_field(), end_date_field()];
        let mut dates = ValidationController::new(Arc::clone(&registry), debounce);
        for field in &date_fields {
            dates.attach_field(field);
        }
        dates.add_date_range(START_DATE_FIELD, END_DATE_FIELD);
        Self {
            registry,
            catalog,
            debounce,
            date_fields,
            date_values: HashMap::new(),
            dates,
            active: None,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<EndpointCatalog> {
        &self.catalog
    }

    /// Start and end date descriptors, rendered once per activation.
    #[must_use]
    pub fn date_fields(&self) -> &[FieldDescriptor] {
        &self.date_fields
    }

    #[must_use]
    pub fn active(&self) -> Option<&FilterFormState> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn selected_endpoint(&self) -> Option<&str> {
        self.active.as_ref().map(FilterFormState::endpoint_key)
    }

    /// Replaces the endpoint block with the one for `key`.
    ///
    /// The previous block (values, errors, pending validations) is discarded
    /// even when the same key is selected again. Unknown or absent keys leave
    /// no block and render the placeholder.
    pub fn select_endpoint(&mut self, key: Option<&str>) -> RenderedForm {
        self.active = None;

        let Some(schema) = key.and_then(|k| self.catalog.get(k)) else {
            if let Some(k) = key {
                debug!(endpoint = k, "endpoint not in catalog, rendering placeholder");
            }
            return RenderedForm::Placeholder {
                message: SELECT_ENDPOINT_MESSAGE,
            };
        };

        let fields = schema.field_descriptors();
        let mut validation = ValidationController::new(Arc::clone(&self.registry), self.debounce);
        for field in &fields {
            validation.attach_field(field);
        }
        let rendered = RenderedForm::Endpoint {
            key: schema.key.clone(),
            display_name: schema.display_name.clone(),
            description: schema.description.clone(),
            tooltip: schema.tooltip.clone(),
            fields: fields.clone(),
            empty_message: fields.is_empty().then_some(NO_FILTERS_MESSAGE),
        };
        self.active = Some(FilterFormState {
            endpoint_key: schema.key.clone(),
            fields,
            values: HashMap::new(),
            validation,
        });
        rendered
    }

    fn is_date_field(field: &str) -> bool {
        field == START_DATE_FIELD || field == END_DATE_FIELD
    }

    /// Records an edit and schedules its debounced validation.
    ///
    /// Returns `false` when the field is not part of the form.
    pub fn input(&mut self, field: &str, value: &str, now: Instant) -> bool {
        if Self::is_date_field(field) {
            self.date_values.insert(field.to_string(), value.to_string());
            self.dates.on_change(field, now);
            return true;
        }
        match self.active.as_mut() {
            Some(state) if state.owns(field) => {
                state.values.insert(field.to_string(), value.to_string());
                state.validation.on_change(field, now);
                true
            }
            _ => false,
        }
    }

    /// Validates `field` immediately, cancelling its pending validation.
    pub fn blur(&mut self, field: &str) -> bool {
        if Self::is_date_field(field) {
            let values = &self.date_values;
            let value = values.get(field).map_or("", String::as_str);
            return self
                .dates
                .on_blur(field, value, |f| values.get(f).map(String::as_str));
        }
        match self.active.as_mut() {
            Some(state) if state.owns(field) => {
                let FilterFormState {
                    values, validation, ..
                } = state;
                let value = values.get(field).map_or("", String::as_str);
                validation.on_blur(field, value, |f| values.get(f).map(String::as_str))
            }
            _ => true,
        }
    }

    /// Runs every debounced validation due at `now` against the field's latest
    /// value. Returns the fields validated.
    pub fn poll(&mut self, now: Instant) -> Vec<String> {
        let mut validated = Vec::new();

        let values = &self.date_values;
        for field in self.dates.take_due(now) {
            let value = values.get(&field).map_or("", String::as_str);
            self.dates
                .validate_with(&field, value, |f| values.get(f).map(String::as_str));
            validated.push(field);
        }

        if let Some(state) = self.active.as_mut() {
            let FilterFormState {
                values, validation, ..
            } = state;
            for field in validation.take_due(now) {
                let value = values.get(&field).map_or("", String::as_str);
                validation.validate_with(&field, value, |f| values.get(f).map(String::as_str));
                validated.push(field);
            }
        }
        validated
    }

    /// Earliest pending debounced validation.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        let dynamic = self
            .active
            .as_ref()
            .and_then(|s| s.validation.next_deadline());
        match (self.dates.next_deadline(), dynamic) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    #[must_use]
    pub fn value(&self, field: &str) -> Option<&str> {
        if Self::is_date_field(field) {
            return self.date_values.get(field).map(String::as_str);
        }
        self.active.as_ref().and_then(|s| s.value(field))
    }

    #[must_use]
    pub fn error(&self, field: &str) -> Option<&FieldError> {
        if Self::is_date_field(field) {
            return self.dates.error(field);
        }
        self.active.as_ref().and_then(|s| s.error(field))
    }

    /// Builds the request from current values without validating them.
    ///
    /// Filters are `Data`, then `DataFim` if filled, then every non-empty
    /// endpoint field in catalog order.
    ///
    /// # Errors
    ///
    /// Returns a [`PreconditionError`] naming each of endpoint and start date
    /// that is missing.
    pub fn compose_filters(&self) -> Result<BulletinRequest, PreconditionError> {
        let filled = |v: Option<&String>| {
            v.map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let start = filled(self.date_values.get(START_DATE_FIELD));

        let mut missing = Vec::new();
        if self.active.is_none() {
            missing.push(MissingInput::Endpoint);
        }
        if start.is_none() {
            missing.push(MissingInput::StartDate);
        }
        let (Some(state), Some(start)) = (self.active.as_ref(), start) else {
            return Err(PreconditionError { missing });
        };

        let mut filters = FilterSet::new();
        filters.insert(START_DATE_FIELD, start);
        if let Some(end) = filled(self.date_values.get(END_DATE_FIELD)) {
            filters.insert(END_DATE_FIELD, end);
        }
        for field in &state.fields {
            if let Some(value) = filled(state.values.get(&field.id)) {
                filters.insert(field.id.clone(), value);
            }
        }
        Ok(BulletinRequest {
            endpoint: state.endpoint_key.clone(),
            filters,
        })
    }

    /// Validates every field (dates first), then composes the request.
    ///
    /// # Errors
    ///
    /// [`ComposeError::Precondition`] when endpoint or start date is missing,
    /// otherwise [`ComposeError::Invalid`] with the first invalid field.
    pub fn submit(&mut self) -> Result<BulletinRequest, ComposeError> {
        let values = &self.date_values;
        let mut first_invalid = self
            .dates
            .validate_all(|f| values.get(f).map(String::as_str));
        if let Some(state) = self.active.as_mut() {
            let FilterFormState {
                values, validation, ..
            } = state;
            let dynamic = validation.validate_all(|f| values.get(f).map(String::as_str));
            first_invalid = first_invalid.or(dynamic);
        }

        let request = self.compose_filters()?;
        match first_invalid {
            Some(first_field) => Err(ComposeError::Invalid { first_field }),
            None => Ok(request),
        }
    }

    /// Re-selects a saved endpoint and fills its values without validating.
    ///
    /// Saved keys that are not fields of the restored form are ignored.
    pub fn restore(&mut self, saved: &SavedBulletinFilters) -> RenderedForm {
        let rendered = self.select_endpoint(saved.endpoint.as_deref());
        for (field, value) in saved.filters.iter() {
            if Self::is_date_field(field) {
                self.date_values.insert(field.to_string(), value.to_string());
            } else if let Some(state) = self.active.as_mut().filter(|s| s.owns(field)) {
                state.values.insert(field.to_string(), value.to_string());
            }
        }
        self.dates.clear_errors();
        rendered
    }
}
