//! Payloads exchanged with the collection engine.
//!
//! All structs use camelCase field names on the wire and serialize with
//! `serde_json`.

pub mod bulletin;
pub mod events;
pub mod series;

pub use bulletin::{BulletinRequest, FilterSet, SavedBulletinFilters};
pub use events::EngineEvent;
pub use series::{
    BackendOutcome, ExportFormat, ExportOutcome, SeriesConfigSnapshot, SeriesPoint, SeriesRecord,
};
