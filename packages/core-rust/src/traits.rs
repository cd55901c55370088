use async_trait::async_trait;

use crate::catalog::WireCatalog;
use crate::messages::{
    BackendOutcome, ExportFormat, ExportOutcome, FilterSet, SavedBulletinFilters,
    SeriesConfigSnapshot, SeriesPoint, SeriesRecord,
};

/// Remote collection engine.
///
/// Every call may fail at the transport level (`Err`); business failures are
/// reported inside the returned outcome instead. Start calls are fire-and-forget:
/// completion arrives later as an [`EngineEvent`](crate::messages::EngineEvent).
#[async_trait]
pub trait CollectionEngine: Send + Sync {
    /// Ids of series that have collected data.
    async fn list_available_series(&self) -> anyhow::Result<Vec<String>>;

    /// Observations of one series. An empty result is not an error.
    async fn fetch_series_data(&self, id: &str) -> anyhow::Result<Vec<SeriesPoint>>;

    async fn export_series(&self, id: &str, format: ExportFormat) -> anyhow::Result<ExportOutcome>;

    /// Currently persisted `code -> table name` configuration.
    async fn fetch_current_series_config(&self) -> anyhow::Result<SeriesConfigSnapshot>;

    /// Validates and persists the whole series list.
    async fn validate_and_save_series_config(
        &self,
        series: &[SeriesRecord],
    ) -> anyhow::Result<BackendOutcome>;

    /// Bulletin endpoint schemas; `None` or empty means no catalog is available.
    async fn fetch_bulletin_endpoint_catalog(
        &self,
    ) -> anyhow::Result<Option<WireCatalog>>;

    async fn fetch_saved_bulletin_filters(&self) -> anyhow::Result<Option<SavedBulletinFilters>>;

    async fn save_bulletin_filters(
        &self,
        filters: &SavedBulletinFilters,
    ) -> anyhow::Result<BackendOutcome>;

    /// Starts collecting every configured series.
    async fn start_series_collection(&self) -> anyhow::Result<()>;

    /// Starts a bulletin collection for `endpoint` with `filters`.
    async fn start_bulletin_collection(
        &self,
        endpoint: &str,
        filters: &FilterSet,
    ) -> anyhow::Result<()>;
}
