//! Coletor core: validator registry, field validation, endpoint catalog,
//! bulletin filter form, series list and the collection lifecycle.

pub mod catalog;
pub mod form;
pub mod lifecycle;
pub mod log;
pub mod messages;
pub mod schema;
pub mod series;
pub mod traits;
pub mod types;
pub mod validation;
pub mod validators;

pub use catalog::{CatalogCache, CatalogError, EndpointCatalog, EndpointSchemaWire, WireCatalog};
pub use form::{
    BulletinForm, ComposeError, FilterFormState, MissingInput, PreconditionError, RenderedForm,
};
pub use lifecycle::{Busy, BusyAffordances, ExitDecision, LifecycleState};
pub use log::Severity;
pub use messages::{BulletinRequest, EngineEvent, FilterSet, SavedBulletinFilters};
pub use schema::{EndpointSchema, FieldDescriptor, FilterKind, RenderHint};
pub use series::{SeriesDefinition, SeriesError, SeriesList};
pub use traits::CollectionEngine;
pub use types::{DataReferenceShape, FieldKind, JobKind, Periodicity};
pub use validation::{FieldError, ValidationController};
pub use validators::ValidatorRegistry;
