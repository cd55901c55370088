//! In-memory `CollectionEngine` with scripted responses for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use coletor_core::messages::{
    BackendOutcome, ExportFormat, ExportOutcome, FilterSet, SavedBulletinFilters,
    SeriesConfigSnapshot, SeriesPoint, SeriesRecord,
};
use coletor_core::{CollectionEngine, EndpointCatalog, WireCatalog};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Script {
    available: Vec<String>,
    points: HashMap<String, Vec<SeriesPoint>>,
    export: Option<ExportOutcome>,
    config: SeriesConfigSnapshot,
    save_outcome: Option<BackendOutcome>,
    catalog: Option<WireCatalog>,
    saved_filters: Option<SavedBulletinFilters>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    saved_series: Vec<Vec<SeriesRecord>>,
    stored_filters: Vec<SavedBulletinFilters>,
    bulletin_starts: Vec<(String, FilterSet)>,
}

/// Records every call and answers from its script.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: Mutex<Script>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine serving the built-in endpoint catalog.
    pub fn with_builtin_catalog() -> Self {
        let engine = Self::new();
        engine.set_catalog(Some(EndpointCatalog::builtin().to_wire()));
        engine
    }

    pub fn set_available(&self, ids: &[&str]) {
        self.script.lock().available = ids.iter().map(ToString::to_string).collect();
    }

    pub fn set_points(&self, id: &str, points: &[(&str, f64)]) {
        let points = points
            .iter()
            .map(|(date, value)| SeriesPoint {
                date: (*date).to_string(),
                value: *value,
            })
            .collect();
        self.script.lock().points.insert(id.to_string(), points);
    }

    pub fn set_export(&self, outcome: ExportOutcome) {
        self.script.lock().export = Some(outcome);
    }

    pub fn set_config(&self, entries: &[(&str, &str)]) {
        self.script.lock().config.series_codes = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
    }

    pub fn set_save_outcome(&self, outcome: BackendOutcome) {
        self.script.lock().save_outcome = Some(outcome);
    }

    pub fn set_catalog(&self, catalog: Option<WireCatalog>) {
        self.script.lock().catalog = catalog;
    }

    pub fn set_saved_filters(&self, saved: Option<SavedBulletinFilters>) {
        self.script.lock().saved_filters = saved;
    }

    /// Makes the named call return a transport error.
    pub fn fail(&self, call: &'static str) {
        self.script.lock().failing.insert(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn saved_series(&self) -> Vec<Vec<SeriesRecord>> {
        self.script.lock().saved_series.clone()
    }

    pub fn stored_filters(&self) -> Vec<SavedBulletinFilters> {
        self.script.lock().stored_filters.clone()
    }

    pub fn bulletin_starts(&self) -> Vec<(String, FilterSet)> {
        self.script.lock().bulletin_starts.clone()
    }

    fn record(&self, call: &'static str) -> anyhow::Result<()> {
        let mut script = self.script.lock();
        script.calls.push(call.to_string());
        if script.failing.contains(call) {
            anyhow::bail!("{call}: connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionEngine for ScriptedEngine {
    async fn list_available_series(&self) -> anyhow::Result<Vec<String>> {
        self.record("list_available_series")?;
        Ok(self.script.lock().available.clone())
    }

    async fn fetch_series_data(&self, id: &str) -> anyhow::Result<Vec<SeriesPoint>> {
        self.record("fetch_series_data")?;
        Ok(self.script.lock().points.get(id).cloned().unwrap_or_default())
    }

    async fn export_series(&self, id: &str, format: ExportFormat) -> anyhow::Result<ExportOutcome> {
        self.record("export_series")?;
        Ok(self.script.lock().export.clone().unwrap_or_else(|| ExportOutcome {
            success: true,
            path: Some(format!("/tmp/{id}.{}", format.as_str())),
            error: None,
        }))
    }

    async fn fetch_current_series_config(&self) -> anyhow::Result<SeriesConfigSnapshot> {
        self.record("fetch_current_series_config")?;
        Ok(self.script.lock().config.clone())
    }

    async fn validate_and_save_series_config(
        &self,
        series: &[SeriesRecord],
    ) -> anyhow::Result<BackendOutcome> {
        self.record("validate_and_save_series_config")?;
        let mut script = self.script.lock();
        script.saved_series.push(series.to_vec());
        Ok(script.save_outcome.clone().unwrap_or_else(BackendOutcome::ok))
    }

    async fn fetch_bulletin_endpoint_catalog(
        &self,
    ) -> anyhow::Result<Option<WireCatalog>> {
        self.record("fetch_bulletin_endpoint_catalog")?;
        Ok(self.script.lock().catalog.clone())
    }

    async fn fetch_saved_bulletin_filters(&self) -> anyhow::Result<Option<SavedBulletinFilters>> {
        self.record("fetch_saved_bulletin_filters")?;
        Ok(self.script.lock().saved_filters.clone())
    }

    async fn save_bulletin_filters(
        &self,
        filters: &SavedBulletinFilters,
    ) -> anyhow::Result<BackendOutcome> {
        self.record("save_bulletin_filters")?;
        let mut script = self.script.lock();
        script.stored_filters.push(filters.clone());
        Ok(script.save_outcome.clone().unwrap_or_else(BackendOutcome::ok))
    }

    async fn start_series_collection(&self) -> anyhow::Result<()> {
        self.record("start_series_collection")
    }

    async fn start_bulletin_collection(
        &self,
        endpoint: &str,
        filters: &FilterSet,
    ) -> anyhow::Result<()> {
        self.record("start_bulletin_collection")?;
        self.script
            .lock()
            .bulletin_starts
            .push((endpoint.to_string(), filters.clone()));
        Ok(())
    }
}
