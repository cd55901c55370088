//! Operator session.
//!
//! Owns everything one operator interacts with: the bulletin filter form, the
//! series list, the results view and the activity log, plus a handle on the
//! process-wide [`LifecycleController`]. Every engine call is awaited in place;
//! transport errors are logged and never end the session.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use coletor_core::catalog::CatalogCache;
use coletor_core::lifecycle::{
    BULLETIN_STARTED_MESSAGE, FINISHED_MESSAGE, SERIES_STARTED_MESSAGE,
};
use coletor_core::messages::{ExportFormat, ExportOutcome, SavedBulletinFilters};
use coletor_core::series::{self, SERIES_ADDED_MESSAGE, SERIES_SAVED_MESSAGE};
use coletor_core::{
    BulletinForm, CollectionEngine, ComposeError, EndpointCatalog, EngineEvent, ExitDecision,
    FieldError, JobKind, RenderedForm, Severity, SeriesList, ValidatorRegistry,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::config::AppConfig;
use crate::lifecycle::LifecycleController;
use crate::results::ResultsView;

/// Logged when a bulletin start is refused for missing or invalid filters.
pub const BULLETIN_NOT_CONFIGURED: &str =
    "Erro: Configure os filtros do Boletim Focus antes de iniciar a coleta.";

/// Shown after the engine stores the bulletin filters.
pub const BULLETIN_SAVED_MESSAGE: &str = "Configurações do Focus salvas com sucesso!";

/// Shown when the engine refuses a save without giving a reason.
pub const UNSPECIFIED_REJECTION: &str = "Erro: o servidor recusou a operação sem informar o motivo.";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Top-level area of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Section {
    #[default]
    ControlPanel,
    Results,
    SeriesSettings,
    BulletinSettings,
}

/// Single summary message shown next to the control that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub text: String,
}

impl Notice {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of a start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Dispatched; the slot is held until the completion signal.
    Started(JobKind),
    /// Another job holds the slot; nothing happened.
    Busy(JobKind),
    /// The request did not compose or validate; nothing was dispatched.
    Rejected(ComposeError),
    /// The engine call failed; the slot was released.
    DispatchFailed(String),
}

fn rejection_reason(error: Option<String>) -> String {
    error
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| UNSPECIFIED_REJECTION.to_string())
}

// ---------------------------------------------------------------------------
// OperatorSession
// ---------------------------------------------------------------------------

/// State and operations of one operator.
pub struct OperatorSession<E: CollectionEngine + ?Sized> {
    engine: Arc<E>,
    config: AppConfig,
    registry: Arc<ValidatorRegistry>,
    lifecycle: Arc<LifecycleController>,
    log: ActivityLog,
    catalog_cache: CatalogCache,
    bulletin: Option<BulletinForm>,
    series: SeriesList,
    results: ResultsView,
    section: Section,
}

impl<E: CollectionEngine + ?Sized> fmt::Debug for OperatorSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSession")
            .field("section", &self.section)
            .field("lifecycle", &self.lifecycle.state())
            .field("series", &self.series.len())
            .finish_non_exhaustive()
    }
}

impl<E: CollectionEngine + ?Sized> OperatorSession<E> {
    #[must_use]
    pub fn new(engine: Arc<E>, config: AppConfig) -> Self {
        let registry = Arc::new(config.validator_registry());
        Self::with_parts(
            engine,
            config,
            registry,
            Arc::new(LifecycleController::new()),
        )
    }

    /// Builds a session around an existing registry and lifecycle slot.
    #[must_use]
    pub fn with_parts(
        engine: Arc<E>,
        config: AppConfig,
        registry: Arc<ValidatorRegistry>,
        lifecycle: Arc<LifecycleController>,
    ) -> Self {
        let log = ActivityLog::new(config.log_capacity);
        Self {
            series: SeriesList::new(Arc::clone(&registry)),
            engine,
            registry,
            lifecycle,
            log,
            catalog_cache: CatalogCache::new(),
            bulletin: None,
            results: ResultsView::new(),
            section: Section::ControlPanel,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    #[must_use]
    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        &self.lifecycle
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn series(&self) -> &SeriesList {
        &self.series
    }

    #[must_use]
    pub fn results(&self) -> &ResultsView {
        &self.results
    }

    #[must_use]
    pub fn bulletin_form(&self) -> Option<&BulletinForm> {
        self.bulletin.as_ref()
    }

    // -- navigation ---------------------------------------------------------

    /// Switches to `section`, running its activation hook.
    ///
    /// Returns the rendered endpoint block when the bulletin settings open.
    pub async fn activate(&mut self, section: Section) -> Option<RenderedForm> {
        if self.section == Section::Results && section != Section::Results {
            self.results.deactivate();
        }
        self.section = section;
        match section {
            Section::ControlPanel => None,
            Section::Results => {
                self.results.activate(&*self.engine, &self.log).await;
                None
            }
            Section::SeriesSettings => {
                self.load_series_config().await;
                None
            }
            Section::BulletinSettings => Some(self.activate_bulletin_settings().await),
        }
    }

    // -- series settings ----------------------------------------------------

    /// Replaces the series list with the engine's persisted configuration.
    pub async fn load_series_config(&mut self) -> Option<Notice> {
        match self.engine.fetch_current_series_config().await {
            Ok(snapshot) => {
                let unrecognised = self.series.load(&snapshot);
                debug!(rows = self.series.len(), "series configuration loaded");
                if unrecognised.is_empty() {
                    return None;
                }
                let text = format!(
                    "Aviso: periodicidade não reconhecida para as séries {}; mantidas sem alteração.",
                    unrecognised.join(", ")
                );
                self.log.warning(&text);
                Some(Notice::new(Severity::Warning, text))
            }
            Err(err) => {
                let text = format!("Erro ao carregar configurações: {err}");
                self.log.error(&text);
                Some(Notice::new(Severity::Error, text))
            }
        }
    }

    #[must_use]
    pub fn preview_table_name(&self, base_name: &str, periodicity: &str) -> Option<String> {
        series::preview_table_name(base_name, periodicity)
    }

    pub fn add_series(&mut self, code: &str, base_name: &str, periodicity: &str) -> Notice {
        match self.series.add(code, base_name, periodicity) {
            Ok(_) => Notice::new(Severity::Success, SERIES_ADDED_MESSAGE),
            Err(err) => Notice::new(Severity::Error, err.to_string()),
        }
    }

    /// Prompt to show before [`remove_series`](Self::remove_series).
    #[must_use]
    pub fn removal_prompt(&self, code: &str) -> String {
        series::removal_prompt(code)
    }

    /// Removes a row once the operator confirmed. No engine call is made.
    pub fn remove_series(&mut self, code: &str, confirmed: bool) -> bool {
        confirmed && self.series.remove(code).is_some()
    }

    /// Sends the whole list to the engine.
    ///
    /// On success every row is marked saved; on any failure the list is left
    /// untouched.
    pub async fn save_series_config(&mut self) -> Notice {
        let payload = match self.series.save_payload() {
            Ok(payload) => payload,
            Err(err) => return Notice::new(Severity::Error, err.to_string()),
        };
        match self.engine.validate_and_save_series_config(&payload).await {
            Ok(outcome) if outcome.success => {
                self.series.mark_saved();
                info!(rows = payload.len(), "series configuration saved");
                Notice::new(Severity::Success, SERIES_SAVED_MESSAGE)
            }
            Ok(outcome) => {
                let reason = rejection_reason(outcome.error);
                warn!(reason = %reason, "series configuration rejected");
                Notice::new(Severity::Error, reason)
            }
            Err(err) => {
                let text = format!("Erro ao salvar: {err}");
                self.log.error(&text);
                Notice::new(Severity::Error, text)
            }
        }
    }

    // -- bulletin settings --------------------------------------------------

    /// Fetches the catalog for a new activation, rebuilds the form and restores
    /// saved filters.
    pub async fn activate_bulletin_settings(&mut self) -> RenderedForm {
        let activation = self.catalog_cache.begin_activation();
        let catalog = match self.engine.fetch_bulletin_endpoint_catalog().await {
            Ok(Some(entries)) if !entries.is_empty() => {
                let (catalog, rejected) = EndpointCatalog::from_wire(entries);
                for err in &rejected {
                    self.log.warning(format!("Aviso: endpoint ignorado ({err})"));
                }
                catalog
            }
            Ok(_) => {
                warn!("engine returned no bulletin endpoints");
                EndpointCatalog::empty()
            }
            Err(err) => {
                self.log
                    .error(format!("Erro ao carregar endpoints do Focus: {err}"));
                EndpointCatalog::empty()
            }
        };
        debug!(activation, endpoints = catalog.len(), "bulletin catalog ready");
        let catalog = self.catalog_cache.populate(catalog);

        let form = self.bulletin.insert(BulletinForm::new(
            Arc::clone(&self.registry),
            catalog,
            self.config.debounce,
        ));

        match self.engine.fetch_saved_bulletin_filters().await {
            Ok(Some(saved)) => form.restore(&saved),
            Ok(None) => form.select_endpoint(None),
            Err(err) => {
                warn!(error = %err, "could not load saved bulletin filters");
                form.select_endpoint(None)
            }
        }
    }

    /// Rebuilds the endpoint block. Without an open form, renders the placeholder.
    pub fn select_endpoint(&mut self, key: Option<&str>) -> RenderedForm {
        match self.bulletin.as_mut() {
            Some(form) => form.select_endpoint(key),
            None => RenderedForm::Placeholder {
                message: coletor_core::form::SELECT_ENDPOINT_MESSAGE,
            },
        }
    }

    pub fn bulletin_input(&mut self, field: &str, value: &str, now: Instant) -> bool {
        self.bulletin
            .as_mut()
            .is_some_and(|form| form.input(field, value, now))
    }

    pub fn bulletin_blur(&mut self, field: &str) -> bool {
        self.bulletin.as_mut().is_none_or(|form| form.blur(field))
    }

    #[must_use]
    pub fn bulletin_error(&self, field: &str) -> Option<&FieldError> {
        self.bulletin.as_ref().and_then(|form| form.error(field))
    }

    /// Runs debounced validations that are due.
    pub fn poll(&mut self, now: Instant) -> Vec<String> {
        self.bulletin
            .as_mut()
            .map(|form| form.poll(now))
            .unwrap_or_default()
    }

    /// Validates and composes the current filters, then asks the engine to
    /// store them.
    pub async fn save_bulletin_filters(&mut self) -> Notice {
        let request = match self.submit_bulletin() {
            Ok(request) => request,
            Err(err) => return Notice::new(Severity::Error, format!("Erro: {err}")),
        };
        let saved = SavedBulletinFilters::from(request);
        match self.engine.save_bulletin_filters(&saved).await {
            Ok(outcome) if outcome.success => {
                self.log.success("Configurações do Boletim Focus salvas.");
                Notice::new(Severity::Success, BULLETIN_SAVED_MESSAGE)
            }
            Ok(outcome) => Notice::new(Severity::Error, rejection_reason(outcome.error)),
            Err(err) => {
                let text = format!("Erro ao salvar: {err}");
                self.log.error(&text);
                Notice::new(Severity::Error, text)
            }
        }
    }

    fn submit_bulletin(&mut self) -> Result<coletor_core::BulletinRequest, ComposeError> {
        match self.bulletin.as_mut() {
            Some(form) => form.submit(),
            None => Err(ComposeError::Precondition(coletor_core::PreconditionError {
                missing: vec![
                    coletor_core::MissingInput::Endpoint,
                    coletor_core::MissingInput::StartDate,
                ],
            })),
        }
    }

    // -- collection lifecycle -----------------------------------------------

    pub async fn start_series_collection(&mut self) -> StartOutcome {
        if let Err(busy) = self.lifecycle.try_begin(JobKind::Series) {
            debug!(running = %busy.running, "start ignored, collection running");
            return StartOutcome::Busy(busy.running);
        }
        self.log.info(SERIES_STARTED_MESSAGE);
        match self.engine.start_series_collection().await {
            Ok(()) => StartOutcome::Started(JobKind::Series),
            Err(err) => self.dispatch_failed(JobKind::Series, &err),
        }
    }

    /// Validates the bulletin form and dispatches it.
    ///
    /// While any job runs this is a no-op and the form is not validated.
    pub async fn start_bulletin_collection(&mut self) -> StartOutcome {
        if let Some(running) = self.lifecycle.state().running_kind() {
            return StartOutcome::Busy(running);
        }
        let request = match self.submit_bulletin() {
            Ok(request) => request,
            Err(err) => {
                self.log.error(BULLETIN_NOT_CONFIGURED);
                return StartOutcome::Rejected(err);
            }
        };
        if let Err(busy) = self.lifecycle.try_begin(JobKind::Bulletin) {
            return StartOutcome::Busy(busy.running);
        }
        self.log.info(BULLETIN_STARTED_MESSAGE);
        self.log
            .info(format!("Endpoint selecionado: {}", request.endpoint));
        match serde_json::to_string(&request.filters) {
            Ok(json) => self.log.info(format!("Filtros aplicados: {json}")),
            Err(err) => warn!(error = %err, "could not render filters"),
        }
        match self
            .engine
            .start_bulletin_collection(&request.endpoint, &request.filters)
            .await
        {
            Ok(()) => StartOutcome::Started(JobKind::Bulletin),
            Err(err) => self.dispatch_failed(JobKind::Bulletin, &err),
        }
    }

    fn dispatch_failed(&self, kind: JobKind, err: &anyhow::Error) -> StartOutcome {
        self.lifecycle.abort(kind);
        let text = format!("Erro ao iniciar coleta: {err}");
        self.log.error(&text);
        StartOutcome::DispatchFailed(text)
    }

    /// Applies an engine notification.
    pub async fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::CollectionFinished { kind } => {
                if self.lifecycle.complete(kind).is_none() {
                    debug!(kind = %kind, "completion signal while idle ignored");
                    return;
                }
                self.log.info(FINISHED_MESSAGE);
                if self.results.is_active() {
                    self.results.refresh(&*self.engine, &self.log).await;
                }
            }
            EngineEvent::LogMessage { message, severity } => {
                self.log.engine(&message, severity);
            }
        }
    }

    #[must_use]
    pub fn request_exit(&self) -> ExitDecision {
        self.lifecycle.exit_decision()
    }

    pub fn clear_log(&self) {
        self.log.clear();
    }

    // -- results ------------------------------------------------------------

    pub async fn select_series(&mut self, id: Option<&str>) {
        self.results.select(&*self.engine, &self.log, id).await;
    }

    pub async fn export_series(&self, format: ExportFormat) -> Option<ExportOutcome> {
        self.results.export(&*self.engine, &self.log, format).await
    }

    /// Writes an error that escaped normal handling to the visible log.
    pub fn report_unexpected(&self, err: &dyn fmt::Display) {
        self.log.error(format!("Erro não tratado: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use coletor_core::messages::{BackendOutcome, FilterSet};
    use coletor_core::{LifecycleState, SeriesError};

    use super::*;
    use crate::testing::ScriptedEngine;

    const SELIC: &str = "ExpectativasMercadoSelic";

    fn config() -> AppConfig {
        AppConfig {
            current_year: Some(2025),
            ..AppConfig::default()
        }
    }

    fn session(engine: &Arc<ScriptedEngine>) -> OperatorSession<ScriptedEngine> {
        OperatorSession::new(Arc::clone(engine), config())
    }

    async fn ready_bulletin(session: &mut OperatorSession<ScriptedEngine>) {
        session.activate(Section::BulletinSettings).await;
        session.select_endpoint(Some(SELIC));
        let now = Instant::now();
        session.bulletin_input("Data", "2024-01-01", now);
        session.bulletin_input("Reuniao", "R255", now);
    }

    #[tokio::test]
    async fn bulletin_start_dispatches_composed_request() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        ready_bulletin(&mut session).await;

        let outcome = session.start_bulletin_collection().await;
        assert_eq!(outcome, StartOutcome::Started(JobKind::Bulletin));
        assert_eq!(session.lifecycle().state(), LifecycleState::Running(JobKind::Bulletin));

        let starts = engine.bulletin_starts();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].0, SELIC);
        let expected: FilterSet = [("Data", "2024-01-01"), ("Reuniao", "R255")].into_iter().collect();
        assert_eq!(starts[0].1, expected);
        assert!(session
            .log()
            .entries()
            .iter()
            .any(|e| e.message == r#"Filtros aplicados: {"Data":"2024-01-01","Reuniao":"R255"}"#));
    }

    #[tokio::test]
    async fn start_while_running_is_noop_for_both_kinds() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        ready_bulletin(&mut session).await;

        assert_eq!(
            session.start_series_collection().await,
            StartOutcome::Started(JobKind::Series)
        );
        assert_eq!(
            session.start_bulletin_collection().await,
            StartOutcome::Busy(JobKind::Series)
        );
        assert_eq!(
            session.start_series_collection().await,
            StartOutcome::Busy(JobKind::Series)
        );
        assert_eq!(engine.call_count("start_series_collection"), 1);
        assert_eq!(engine.call_count("start_bulletin_collection"), 0);
    }

    #[tokio::test]
    async fn invalid_filters_never_reach_engine() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        ready_bulletin(&mut session).await;
        session.bulletin_input("Reuniao", "255", Instant::now());

        let outcome = session.start_bulletin_collection().await;
        assert_eq!(
            outcome,
            StartOutcome::Rejected(ComposeError::Invalid {
                first_field: "Reuniao".into()
            })
        );
        assert_eq!(session.lifecycle().state(), LifecycleState::Idle);
        assert_eq!(engine.call_count("start_bulletin_collection"), 0);
        assert!(session.bulletin_error("Reuniao").is_some());
        assert_eq!(session.log().last().unwrap().message, BULLETIN_NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn start_without_form_is_precondition_failure() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        let outcome = session.start_bulletin_collection().await;
        assert!(matches!(
            outcome,
            StartOutcome::Rejected(ComposeError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn dispatch_failure_releases_slot() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.fail("start_series_collection");
        let mut session = session(&engine);
        let outcome = session.start_series_collection().await;
        assert!(matches!(outcome, StartOutcome::DispatchFailed(_)));
        assert!(!session.lifecycle().is_running());
        assert_eq!(session.log().last().unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn completion_returns_to_idle_and_refreshes_results() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.set_available(&["ipca_mensal"]);
        let mut session = session(&engine);
        session.activate(Section::Results).await;
        session.start_series_collection().await;

        engine.set_available(&["ipca_mensal", "selic_diaria"]);
        session
            .on_engine_event(EngineEvent::CollectionFinished { kind: JobKind::Series })
            .await;
        assert_eq!(session.lifecycle().state(), LifecycleState::Idle);
        assert!(session.lifecycle().affordances().start_enabled);
        assert_eq!(session.results().series().len(), 2);
        assert_eq!(session.log().last().unwrap().message, FINISHED_MESSAGE);
    }

    #[tokio::test]
    async fn completion_while_idle_is_ignored() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut session = session(&engine);
        session
            .on_engine_event(EngineEvent::CollectionFinished { kind: JobKind::Bulletin })
            .await;
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn results_not_refreshed_when_inactive() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut session = session(&engine);
        session.activate(Section::Results).await;
        session.activate(Section::ControlPanel).await;
        session.start_series_collection().await;
        session
            .on_engine_event(EngineEvent::CollectionFinished { kind: JobKind::Series })
            .await;
        assert_eq!(engine.call_count("list_available_series"), 1);
    }

    #[tokio::test]
    async fn exit_requires_confirmation_while_running() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut session = session(&engine);
        assert_eq!(session.request_exit(), ExitDecision::Allow);
        session.start_series_collection().await;
        assert!(matches!(session.request_exit(), ExitDecision::Confirm(_)));
        assert!(session.lifecycle().is_running());
    }

    #[tokio::test]
    async fn engine_log_messages_are_classified() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut session = session(&engine);
        session
            .on_engine_event(EngineEvent::LogMessage {
                message: "Aviso: série 433 sem dados".into(),
                severity: None,
            })
            .await;
        assert_eq!(session.log().last().unwrap().severity, Severity::Warning);
    }

    #[tokio::test]
    async fn missing_catalog_renders_placeholder() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut session = session(&engine);
        let rendered = session.activate(Section::BulletinSettings).await.unwrap();
        assert!(rendered.is_placeholder());
        assert!(session.select_endpoint(Some(SELIC)).is_placeholder());
    }

    #[tokio::test]
    async fn catalog_fetch_failure_is_logged_not_fatal() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.fail("fetch_bulletin_endpoint_catalog");
        let mut session = session(&engine);
        let rendered = session.activate(Section::BulletinSettings).await.unwrap();
        assert!(rendered.is_placeholder());
        assert_eq!(session.log().last().unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn catalog_is_refetched_per_activation() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        session.activate(Section::BulletinSettings).await;
        session.activate(Section::ControlPanel).await;
        session.activate(Section::BulletinSettings).await;
        assert_eq!(engine.call_count("fetch_bulletin_endpoint_catalog"), 2);
    }

    #[tokio::test]
    async fn saved_filters_are_restored_on_activation() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        engine.set_saved_filters(Some(SavedBulletinFilters {
            endpoint: Some(SELIC.into()),
            filters: [("Data", "2024-03-01"), ("Reuniao", "R260")].into_iter().collect(),
        }));
        let mut session = session(&engine);
        let rendered = session.activate(Section::BulletinSettings).await.unwrap();
        assert!(!rendered.is_placeholder());
        let form = session.bulletin_form().unwrap();
        assert_eq!(form.selected_endpoint(), Some(SELIC));
        assert_eq!(form.value("Reuniao"), Some("R260"));
    }

    #[tokio::test]
    async fn save_bulletin_filters_round_trip() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        ready_bulletin(&mut session).await;
        let notice = session.save_bulletin_filters().await;
        assert_eq!(notice.text, BULLETIN_SAVED_MESSAGE);
        let stored = engine.stored_filters();
        assert_eq!(stored[0].endpoint.as_deref(), Some(SELIC));
        assert_eq!(stored[0].filters.get("Reuniao"), Some("R255"));
    }

    #[tokio::test]
    async fn save_bulletin_filters_requires_endpoint_and_date() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        session.activate(Section::BulletinSettings).await;
        let notice = session.save_bulletin_filters().await;
        assert!(notice.is_error());
        assert!(notice.text.contains("Endpoint"));
        assert!(notice.text.contains("Data de Início"));
        assert_eq!(engine.call_count("save_bulletin_filters"), 0);
    }

    #[tokio::test]
    async fn debounced_input_is_validated_by_poll() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let mut session = session(&engine);
        session.activate(Section::BulletinSettings).await;
        session.select_endpoint(Some(SELIC));
        let t0 = Instant::now();
        session.bulletin_input("Reuniao", "X", t0);
        assert!(session.poll(t0).is_empty());
        assert_eq!(session.poll(t0 + Duration::from_millis(300)), vec!["Reuniao".to_string()]);
        assert!(session.bulletin_error("Reuniao").is_some());
    }

    #[tokio::test]
    async fn series_settings_load_add_remove_save() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.set_config(&[("433", "ipca_mensal")]);
        let mut session = session(&engine);
        session.activate(Section::SeriesSettings).await;
        assert_eq!(session.series().len(), 1);

        assert_eq!(session.add_series("11", "Selic", "diaria").text, SERIES_ADDED_MESSAGE);
        let dup = session.add_series("11", "Selic Meta", "anual");
        assert!(dup.is_error());
        assert_eq!(dup.text, SeriesError::Duplicate("11".into()).to_string());

        assert!(!session.remove_series("433", false));
        assert_eq!(session.removal_prompt("433"), "Tem certeza que deseja remover a série 433?");
        assert!(session.remove_series("433", true));
        assert!(engine.saved_series().is_empty());

        let notice = session.save_series_config().await;
        assert_eq!(notice.text, SERIES_SAVED_MESSAGE);
        assert!(!session.series().has_unsaved());
        assert_eq!(engine.saved_series()[0][0].table_name, "selic_diaria");
    }

    #[tokio::test]
    async fn rejected_save_shows_reason_and_keeps_list() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.set_save_outcome(BackendOutcome::failed("Série 99999 não encontrada no SGS"));
        let mut session = session(&engine);
        session.add_series("99999", "Teste", "mensal");
        let notice = session.save_series_config().await;
        assert_eq!(notice.text, "Série 99999 não encontrada no SGS");
        assert!(session.series().has_unsaved());
        assert_eq!(session.series().len(), 1);
    }

    #[tokio::test]
    async fn unrecognised_rows_survive_load_and_save() {
        let engine = Arc::new(ScriptedEngine::new());
        engine.set_config(&[("433", "ipca_mensal"), ("7", "ibc_br")]);
        let mut session = session(&engine);
        session.activate(Section::SeriesSettings).await;
        assert_eq!(session.series().len(), 2);
        let last = session.log().last().unwrap();
        assert_eq!(last.severity, Severity::Warning);
        assert!(last.message.contains('7'));

        session.add_series("11", "Selic", "diaria");
        let notice = session.save_series_config().await;
        assert_eq!(notice.text, SERIES_SAVED_MESSAGE);
        let saved = &engine.saved_series()[0];
        let codes: Vec<&str> = saved.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["433", "7", "11"]);
        let seven = saved.iter().find(|r| r.code == "7").unwrap();
        assert_eq!(seven.table_name, "ibc_br");
    }

    #[tokio::test]
    async fn rejection_without_reason_shows_generic_message() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        engine.set_save_outcome(BackendOutcome {
            success: false,
            error: None,
        });
        let mut session = session(&engine);
        session.add_series("433", "IPCA", "mensal");
        let notice = session.save_series_config().await;
        assert!(notice.is_error());
        assert_eq!(notice.text, UNSPECIFIED_REJECTION);

        ready_bulletin(&mut session).await;
        let notice = session.save_bulletin_filters().await;
        assert_eq!(notice.text, UNSPECIFIED_REJECTION);
    }

    #[tokio::test]
    async fn empty_series_list_is_not_sent() {
        let engine = Arc::new(ScriptedEngine::new());
        let mut session = session(&engine);
        let notice = session.save_series_config().await;
        assert_eq!(notice.text, SeriesError::EmptyList.to_string());
        assert_eq!(engine.call_count("validate_and_save_series_config"), 0);
    }

    #[tokio::test]
    async fn report_unexpected_logs_error() {
        let engine = Arc::new(ScriptedEngine::new());
        let session = session(&engine);
        session.report_unexpected(&"falha inesperada");
        let last = session.log().last().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert_eq!(last.message, "Erro não tratado: falha inesperada");
    }
}
