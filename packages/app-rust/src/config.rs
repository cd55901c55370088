//! Application configuration.

use std::time::Duration;

use chrono::Datelike;
use coletor_core::validators::{FIRST_REFERENCE_YEAR, REFERENCE_YEAR_HORIZON};
use coletor_core::ValidatorRegistry;

use crate::telemetry::LogFormat;

/// Operator-session configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Delay between the last edit of a field and its validation.
    pub debounce: Duration,
    /// Interval at which the session driver polls for due validations.
    pub tick_interval: Duration,
    /// Entries kept by the activity log before the oldest are dropped.
    pub log_capacity: usize,
    /// Bounded capacity of the driver's command channel.
    pub command_channel_capacity: usize,
    /// Lowest accepted reference year.
    pub first_reference_year: i32,
    /// Years past the current one a reference year may point to.
    pub reference_year_horizon: i32,
    /// Overrides the calendar year used for the reference window. `None` uses
    /// the local clock.
    pub current_year: Option<i32>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Builds the validator registry for this configuration.
    #[must_use]
    pub fn validator_registry(&self) -> ValidatorRegistry {
        let current = self
            .current_year
            .unwrap_or_else(|| chrono::Local::now().year());
        ValidatorRegistry::with_reference_window(
            self.first_reference_year,
            current + self.reference_year_horizon,
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            tick_interval: Duration::from_millis(50),
            log_capacity: 500,
            command_channel_capacity: 256,
            first_reference_year: FIRST_REFERENCE_YEAR,
            reference_year_horizon: REFERENCE_YEAR_HORIZON,
            current_year: None,
            log_format: LogFormat::Pretty,
        }
    }
}
