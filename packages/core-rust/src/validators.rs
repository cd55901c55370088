//! Named validator registry.
//!
//! A validator is a pure predicate over the raw field text plus the message shown
//! when it fails. The registry ships with the built-in validators used by the
//! bulletin filter form and the series editor, and accepts additional ones at
//! startup via [`ValidatorRegistry::register`].
//!
//! Predicates never panic: malformed input evaluates to `false`. Whether an empty
//! value is acceptable for a *required* field is decided by the validation
//! controller, not by the predicates.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

/// Names of the built-in validators and message keys.
pub mod names {
    pub const DATE: &str = "date";
    pub const SERIES_CODE: &str = "seriesCode";
    pub const BASE_NAME: &str = "baseName";
    pub const INDICATOR: &str = "indicator";
    pub const MEETING: &str = "meeting";
    pub const YEAR_REFERENCE: &str = "yearReference";
    pub const MONTH_REFERENCE: &str = "monthReference";
    pub const QUARTER_REFERENCE: &str = "quarterReference";
    /// Message key used when a required field is empty.
    pub const REQUIRED: &str = "required";
    /// Message key used when a validator has no message of its own.
    pub const GENERIC: &str = "generic";
}

/// Lowest accepted reference year.
pub const FIRST_REFERENCE_YEAR: i32 = 2000;

/// How many years past the current one a reference year may point to.
pub const REFERENCE_YEAR_HORIZON: i32 = 10;

/// Substrings a series base name must not contain (compared lowercase).
pub const PERIOD_KEYWORDS: [&str; 4] = ["diaria", "mensal", "anual", "diário"];

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date regex"));
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid digits regex"));
static MEETING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^R[0-9]{3}$").expect("valid meeting regex"));
static MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(jan|fev|mar|abr|mai|jun|jul|ago|set|out|nov|dez)/[0-9]{4}$")
        .expect("valid month regex")
});
static QUARTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-4]/[0-9]{4}$").expect("valid quarter regex"));

/// Shared predicate over the raw field value.
pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A named predicate and the message reported when it fails.
#[derive(Clone)]
pub struct ValidatorSpec {
    pub name: String,
    pub predicate: Predicate,
    pub message: String,
}

impl ValidatorSpec {
    /// Evaluates the predicate against `value`.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        (self.predicate)(value)
    }
}

impl fmt::Debug for ValidatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorSpec")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ValidatorRegistry
// ---------------------------------------------------------------------------

/// Registry of named validators.
///
/// Built once at startup and then shared read-only (typically behind an `Arc`)
/// by every form that attaches validators. Re-registering a name replaces the
/// previous validator but keeps its original position in [`names`](Self::names).
#[derive(Debug)]
pub struct ValidatorRegistry {
    by_name: HashMap<String, ValidatorSpec>,
    order: Vec<String>,
    messages: HashMap<&'static str, String>,
}

impl ValidatorRegistry {
    /// Creates a registry with only the `required`/`generic` messages.
    #[must_use]
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert(names::REQUIRED, "Este campo é obrigatório".to_string());
        messages.insert(names::GENERIC, "Valor inválido".to_string());
        Self {
            by_name: HashMap::new(),
            order: Vec::new(),
            messages,
        }
    }

    /// Creates a registry holding every built-in validator, using the local
    /// calendar year for `yearReference`.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::with_builtins_for_year(chrono::Local::now().year())
    }

    /// Creates a registry holding every built-in validator, with
    /// `yearReference` bounded by `current_year + REFERENCE_YEAR_HORIZON`.
    #[must_use]
    pub fn with_builtins_for_year(current_year: i32) -> Self {
        Self::with_reference_window(FIRST_REFERENCE_YEAR, current_year + REFERENCE_YEAR_HORIZON)
    }

    /// Creates a registry holding every built-in validator, accepting reference
    /// years in `first_year..=last_year`.
    #[must_use]
    pub fn with_reference_window(first_year: i32, last_year: i32) -> Self {
        let mut reg = Self::new();

        reg.register(
            names::DATE,
            is_valid_date_or_empty,
            "Data deve estar no formato YYYY-MM-DD",
        );
        reg.register(
            names::SERIES_CODE,
            |v| DIGITS_RE.is_match(v.trim()),
            "Código da série deve conter apenas números",
        );
        reg.register(
            names::BASE_NAME,
            is_valid_base_name,
            "Nome base deve ter pelo menos 2 caracteres e não conter palavras de período",
        );
        reg.register(
            names::INDICATOR,
            |v| optional(v, |t| (2..=50).contains(&t.chars().count())),
            "Indicador deve ter entre 2 e 50 caracteres",
        );
        reg.register(
            names::MEETING,
            |v| optional(v, |t| MEETING_RE.is_match(t)),
            "Reunião deve estar no formato R255 (R + 3 dígitos)",
        );
        reg.register(
            names::YEAR_REFERENCE,
            move |v| {
                optional(v, |t| {
                    t.parse::<i32>()
                        .is_ok_and(|year| (first_year..=last_year).contains(&year))
                })
            },
            format!("Ano deve estar entre {first_year} e {last_year}"),
        );
        reg.register(
            names::MONTH_REFERENCE,
            |v| optional(v, |t| MONTH_RE.is_match(t)),
            "Data deve estar no formato mmm/yyyy (ex: jan/2024)",
        );
        reg.register(
            names::QUARTER_REFERENCE,
            |v| optional(v, |t| QUARTER_RE.is_match(t)),
            "Data deve estar no formato t/yyyy (ex: 1/2024)",
        );
        reg
    }

    /// Registers (or replaces) a validator.
    pub fn register<F>(&mut self, name: &str, predicate: F, message: impl Into<String>)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let spec = ValidatorSpec {
            name: name.to_string(),
            predicate: Arc::new(predicate),
            message: message.into(),
        };
        if self.by_name.insert(name.to_string(), spec).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// Runs the named validator. Unknown names have nothing to check and pass.
    #[must_use]
    pub fn validate(&self, name: &str, value: &str) -> bool {
        match self.by_name.get(name) {
            Some(spec) => spec.check(value),
            None => {
                debug!(validator = name, "unknown validator, treating as pass");
                true
            }
        }
    }

    /// Message for a validator or message key, falling back to the generic one.
    #[must_use]
    pub fn message_for(&self, name: &str) -> &str {
        if let Some(msg) = self.messages.get(name) {
            return msg;
        }
        match self.by_name.get(name) {
            Some(spec) if !spec.message.is_empty() => &spec.message,
            _ => self.generic_message(),
        }
    }

    /// Message shown when a required field is empty.
    #[must_use]
    pub fn required_message(&self) -> &str {
        self.messages
            .get(names::REQUIRED)
            .map_or("required", String::as_str)
    }

    fn generic_message(&self) -> &str {
        self.messages
            .get(names::GENERIC)
            .map_or("invalid", String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ValidatorSpec> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Validator names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Empty (after trim) passes; otherwise `check` decides on the trimmed text.
fn optional(value: &str, check: impl Fn(&str) -> bool) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || check(trimmed)
}

/// `YYYY-MM-DD` naming a real calendar day.
#[must_use]
pub fn is_valid_date(value: &str) -> bool {
    DATE_RE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_valid_date_or_empty(value: &str) -> bool {
    value.is_empty() || is_valid_date(value)
}

fn is_valid_base_name(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.chars().count() < 2 {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !PERIOD_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn registry() -> ValidatorRegistry {
        ValidatorRegistry::with_builtins_for_year(2025)
    }

    #[test]
    fn date_accepts_real_calendar_days_only() {
        let reg = registry();
        assert!(reg.validate(names::DATE, "2024-02-29"));
        assert!(!reg.validate(names::DATE, "2024-02-30"));
        assert!(!reg.validate(names::DATE, "2023-02-29"));
        assert!(!reg.validate(names::DATE, "2024/02/01"));
        assert!(!reg.validate(names::DATE, "24-02-01"));
        assert!(reg.validate(names::DATE, ""));
    }

    #[test]
    fn series_code_requires_digits() {
        let reg = registry();
        assert!(reg.validate(names::SERIES_CODE, "12345"));
        assert!(!reg.validate(names::SERIES_CODE, ""));
        assert!(!reg.validate(names::SERIES_CODE, "12a45"));
        assert!(!reg.validate(names::SERIES_CODE, "-12"));
        assert!(!reg.validate(names::SERIES_CODE, "١٤٣٣"));
    }

    #[test]
    fn base_name_rejects_period_keywords() {
        let reg = registry();
        assert!(reg.validate(names::BASE_NAME, "Taxa de Juros"));
        assert!(!reg.validate(names::BASE_NAME, " a "));
        assert!(!reg.validate(names::BASE_NAME, "IPCA Mensal"));
        assert!(!reg.validate(names::BASE_NAME, "selic DIARIA"));
        assert!(!reg.validate(names::BASE_NAME, "câmbio diário"));
        assert!(!reg.validate(names::BASE_NAME, ""));
    }

    #[test]
    fn indicator_length_bounds() {
        let reg = registry();
        assert!(reg.validate(names::INDICATOR, "IPCA"));
        assert!(reg.validate(names::INDICATOR, ""));
        assert!(!reg.validate(names::INDICATOR, "I"));
        assert!(reg.validate(names::INDICATOR, &"x".repeat(50)));
        assert!(!reg.validate(names::INDICATOR, &"x".repeat(51)));
    }

    #[test]
    fn meeting_is_case_sensitive() {
        let reg = registry();
        assert!(reg.validate(names::MEETING, "R255"));
        assert!(!reg.validate(names::MEETING, "R25"));
        assert!(!reg.validate(names::MEETING, "r255"));
        assert!(!reg.validate(names::MEETING, "R2555"));
        assert!(!reg.validate(names::MEETING, "R١٢٣"));
    }

    #[test]
    fn year_reference_window_follows_current_year() {
        let reg = registry();
        assert!(reg.validate(names::YEAR_REFERENCE, "2000"));
        assert!(reg.validate(names::YEAR_REFERENCE, "2035"));
        assert!(!reg.validate(names::YEAR_REFERENCE, "2036"));
        assert!(!reg.validate(names::YEAR_REFERENCE, "1999"));
        assert!(!reg.validate(names::YEAR_REFERENCE, "20x4"));
        assert!(reg.message_for(names::YEAR_REFERENCE).contains("2035"));
    }

    #[test]
    fn reference_window_is_configurable() {
        let reg = ValidatorRegistry::with_reference_window(2010, 2020);
        assert!(!reg.validate(names::YEAR_REFERENCE, "2009"));
        assert!(reg.validate(names::YEAR_REFERENCE, "2020"));
        assert!(!reg.validate(names::YEAR_REFERENCE, "2021"));
    }

    #[test]
    fn month_and_quarter_references() {
        let reg = registry();
        assert!(reg.validate(names::MONTH_REFERENCE, "jan/2024"));
        assert!(reg.validate(names::MONTH_REFERENCE, "Dez/2024"));
        assert!(!reg.validate(names::MONTH_REFERENCE, "jan/24"));
        assert!(!reg.validate(names::MONTH_REFERENCE, "feb/2024"));
        assert!(reg.validate(names::QUARTER_REFERENCE, "4/2024"));
        assert!(!reg.validate(names::QUARTER_REFERENCE, "5/2024"));
        assert!(!reg.validate(names::QUARTER_REFERENCE, "1/24"));
        assert!(!reg.validate(names::QUARTER_REFERENCE, "1/٢٠٢٤"));
        assert!(!reg.validate(names::MONTH_REFERENCE, "jan/٢٠٢٤"));
        assert!(!reg.validate(names::DATE, "٢٠٢٤-01-01"));
    }

    #[test]
    fn custom_validator_registration_and_replacement() {
        let mut reg = registry();
        reg.register("even", |v| v.parse::<u32>().is_ok_and(|n| n % 2 == 0), "must be even");
        assert!(reg.validate("even", "4"));
        assert!(!reg.validate("even", "3"));
        assert_eq!(reg.message_for("even"), "must be even");

        let before = reg.names().count();
        reg.register("even", |_| true, "");
        assert_eq!(reg.names().count(), before);
        assert!(reg.validate("even", "3"));
        assert_eq!(reg.message_for("even"), "Valor inválido");
    }

    #[test]
    fn unknown_validator_passes_with_generic_message() {
        let reg = registry();
        assert!(reg.validate("doesNotExist", "anything"));
        assert_eq!(reg.message_for("doesNotExist"), "Valor inválido");
        assert_eq!(reg.message_for(names::REQUIRED), "Este campo é obrigatório");
    }

    #[test]
    fn builtins_registered_in_order() {
        let reg = registry();
        let got: Vec<&str> = reg.names().collect();
        assert_eq!(
            got,
            vec![
                names::DATE,
                names::SERIES_CODE,
                names::BASE_NAME,
                names::INDICATOR,
                names::MEETING,
                names::YEAR_REFERENCE,
                names::MONTH_REFERENCE,
                names::QUARTER_REFERENCE,
            ]
        );
    }

    proptest! {
        #[test]
        fn builtin_predicates_are_total(value in any::<String>()) {
            let reg = registry();
            let names: Vec<String> = reg.names().map(str::to_string).collect();
            for name in names {
                let _ = reg.validate(&name, &value);
            }
        }

        #[test]
        fn digit_strings_are_series_codes(code in "[0-9]{1,12}") {
            prop_assert!(registry().validate(names::SERIES_CODE, &code));
        }
    }
}
