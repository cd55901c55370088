//! Field validation controller.
//!
//! Binds fields to validator names from a shared [`ValidatorRegistry`], keeps one
//! error slot per field, and debounces validation of in-progress edits. Time is
//! passed in explicitly (`now: Instant`) so the owner decides when pending
//! validations come due.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::FieldDescriptor;
use crate::validators::{names, ValidatorRegistry};

/// Default delay between the last edit and its validation.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Validator name reported for the end-before-start rule.
pub const DATE_RANGE: &str = "dateRange";

/// Message shown on the end date when it precedes the start date.
pub const DATE_RANGE_MESSAGE: &str = "Data de fim deve ser posterior à data de início";

// ---------------------------------------------------------------------------
// Error slots
// ---------------------------------------------------------------------------

/// Error currently shown for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Validator (or `required`) that failed.
    pub validator: String,
    pub message: String,
}

/// At most one visible error per field.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlots {
    slots: HashMap<String, FieldError>,
}

impl ErrorSlots {
    /// Shows `error` on `field`, replacing whatever was there.
    pub fn show(&mut self, field: &str, error: FieldError) {
        self.slots.insert(field.to_string(), error);
    }

    pub fn clear(&mut self, field: &str) {
        self.slots.remove(field);
    }

    pub fn clear_all(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.slots.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.slots.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Per-field deadlines for deferred validation.
///
/// Scheduling a field that already has a pending deadline replaces it, so only
/// the last edit inside the window is validated.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: HashMap<String, Instant>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, field: &str, now: Instant) {
        self.pending.insert(field.to_string(), now + self.delay);
    }

    /// Drops the pending deadline; returns whether one existed.
    pub fn cancel(&mut self, field: &str) -> bool {
        self.pending.remove(field).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    #[must_use]
    pub fn is_pending(&self, field: &str) -> bool {
        self.pending.contains_key(field)
    }

    /// Earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Removes and returns every field whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<(String, Instant)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(field, deadline)| (field.clone(), *deadline))
            .collect();
        due.sort_by_key(|(_, deadline)| *deadline);
        for (field, _) in &due {
            self.pending.remove(field);
        }
        due.into_iter().map(|(field, _)| field).collect()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

// ---------------------------------------------------------------------------
// ValidationController
// ---------------------------------------------------------------------------

/// Validators bound to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub required: bool,
    pub validators: Vec<String>,
}

/// `end` must not precede `start` when both are filled.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DateRangeRule {
    start: String,
    end: String,
}

/// Validates bound fields and tracks their error slots.
#[derive(Debug)]
pub struct ValidationController {
    registry: Arc<ValidatorRegistry>,
    bindings: Vec<(String, FieldBinding)>,
    range_rules: Vec<DateRangeRule>,
    errors: ErrorSlots,
    debouncer: Debouncer,
}

impl ValidationController {
    #[must_use]
    pub fn new(registry: Arc<ValidatorRegistry>, debounce: Duration) -> Self {
        Self {
            registry,
            bindings: Vec::new(),
            range_rules: Vec::new(),
            errors: ErrorSlots::default(),
            debouncer: Debouncer::new(debounce),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    /// Binds `validators` to `field`, replacing any previous binding.
    ///
    /// Rebinding keeps the field's position in [`validate_all`](Self::validate_all)
    /// order and clears its error and pending validation.
    pub fn attach<S: AsRef<str>>(&mut self, field: &str, required: bool, validators: &[S]) {
        let binding = FieldBinding {
            required,
            validators: validators.iter().map(|v| v.as_ref().to_string()).collect(),
        };
        match self.bindings.iter_mut().find(|(id, _)| id == field) {
            Some((_, slot)) => *slot = binding,
            None => self.bindings.push((field.to_string(), binding)),
        }
        self.errors.clear(field);
        self.debouncer.cancel(field);
    }

    /// Binds a field using its descriptor's `required` flag and validator names.
    pub fn attach_field(&mut self, field: &FieldDescriptor) {
        self.attach(&field.id, field.required, field.validator_names.as_slice());
    }

    /// Removes a field's binding, error and pending validation.
    pub fn detach(&mut self, field: &str) {
        self.bindings.retain(|(id, _)| id != field);
        self.range_rules.retain(|r| r.start != field && r.end != field);
        self.errors.clear(field);
        self.debouncer.cancel(field);
    }

    /// Requires `end` to be on or after `start`; checked when `end` is validated
    /// with context.
    pub fn add_date_range(&mut self, start: &str, end: &str) {
        let rule = DateRangeRule {
            start: start.to_string(),
            end: end.to_string(),
        };
        if !self.range_rules.contains(&rule) {
            self.range_rules.push(rule);
        }
    }

    #[must_use]
    pub fn binding(&self, field: &str) -> Option<&FieldBinding> {
        self.bindings
            .iter()
            .find(|(id, _)| id == field)
            .map(|(_, b)| b)
    }

    /// Bound field ids in attach order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(id, _)| id.as_str())
    }

    /// Validates `value` against the field's own rules and updates its slot.
    ///
    /// An unbound field has nothing to check and passes.
    pub fn validate(&mut self, field: &str, value: &str) -> bool {
        let Some(binding) = self.binding(field) else {
            self.errors.clear(field);
            return true;
        };

        let failure = if value.trim().is_empty() {
            binding.required.then(|| FieldError {
                validator: names::REQUIRED.to_string(),
                message: self.registry.required_message().to_string(),
            })
        } else {
            binding
                .validators
                .iter()
                .find(|name| !self.registry.validate(name, value))
                .map(|name| FieldError {
                    validator: name.clone(),
                    message: self.registry.message_for(name).to_string(),
                })
        };

        match failure {
            Some(error) => {
                self.errors.show(field, error);
                false
            }
            None => {
                self.errors.clear(field);
                true
            }
        }
    }

    /// Validates a field and then any cross-field rule it ends, reading peer
    /// values through `lookup`.
    pub fn validate_with<'a, F>(&mut self, field: &str, value: &str, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        if !self.validate(field, value) {
            return false;
        }
        let starts: Vec<String> = self
            .range_rules
            .iter()
            .filter(|r| r.end == field)
            .map(|r| r.start.clone())
            .collect();
        for start_field in starts {
            let start = lookup(&start_field).unwrap_or_default();
            if ends_before(start, value) {
                self.errors.show(
                    field,
                    FieldError {
                        validator: DATE_RANGE.to_string(),
                        message: DATE_RANGE_MESSAGE.to_string(),
                    },
                );
                return false;
            }
        }
        true
    }

    /// Blur: cancels the pending validation and validates immediately.
    pub fn on_blur<'a, F>(&mut self, field: &str, value: &str, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        self.debouncer.cancel(field);
        self.validate_with(field, value, lookup)
    }

    /// Edit: (re)schedules the field's validation one debounce delay from `now`.
    pub fn on_change(&mut self, field: &str, now: Instant) {
        if self.binding(field).is_some() {
            self.debouncer.schedule(field, now);
        }
    }

    /// Fields whose debounced validation is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        self.debouncer.take_due(now)
    }

    #[must_use]
    pub fn is_pending(&self, field: &str) -> bool {
        self.debouncer.is_pending(field)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Validates every bound field in attach order, cancelling pending
    /// validations. Returns the first invalid field, if any.
    pub fn validate_all<'a, F>(&mut self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<&'a str> + Copy,
    {
        self.debouncer.cancel_all();
        let fields: Vec<String> = self.bindings.iter().map(|(id, _)| id.clone()).collect();
        let mut first_invalid = None;
        for field in fields {
            let value = lookup(&field).unwrap_or_default();
            if !self.validate_with(&field, value, lookup) && first_invalid.is_none() {
                first_invalid = Some(field);
            }
        }
        first_invalid
    }

    #[must_use]
    pub fn error(&self, field: &str) -> Option<&FieldError> {
        self.errors.get(field)
    }

    #[must_use]
    pub fn errors(&self) -> &ErrorSlots {
        &self.errors
    }

    /// Clears every error slot without touching bindings.
    pub fn clear_errors(&mut self) {
        self.errors.clear_all();
    }
}

/// Both values parse as dates and `end` is strictly earlier than `start`.
fn ends_before(start: &str, end: &str) -> bool {
    let parse = |v: &str| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok();
    match (parse(start), parse(end)) {
        (Some(start), Some(end)) => end < start,
        _ => false,
    }
}
