//! Results view: collected series, their data and exports.

use coletor_core::messages::{ExportFormat, ExportOutcome, SeriesPoint};
use coletor_core::CollectionEngine;

use crate::activity::ActivityLog;

/// State of the results view.
#[derive(Debug, Default)]
pub struct ResultsView {
    active: bool,
    series: Vec<String>,
    selected: Option<String>,
    data: Vec<SeriesPoint>,
}

impl ResultsView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn series(&self) -> &[String] {
        &self.series
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn data(&self) -> &[SeriesPoint] {
        &self.data
    }

    /// Export is offered only with a selected series.
    #[must_use]
    pub fn export_enabled(&self) -> bool {
        self.selected.is_some()
    }

    pub async fn activate<E>(&mut self, engine: &E, log: &ActivityLog)
    where
        E: CollectionEngine + ?Sized,
    {
        self.active = true;
        self.refresh(engine, log).await;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Reloads the series list. A selection no longer listed is dropped.
    pub async fn refresh<E>(&mut self, engine: &E, log: &ActivityLog)
    where
        E: CollectionEngine + ?Sized,
    {
        match engine.list_available_series().await {
            Ok(series) => {
                self.series = series;
                if let Some(sel) = &self.selected {
                    if !self.series.contains(sel) {
                        self.selected = None;
                        self.data.clear();
                    }
                }
            }
            Err(err) => log.error(format!("Erro ao carregar lista de séries: {err}")),
        }
    }

    /// Selects a series and loads its data; `None` clears the table.
    pub async fn select<E>(&mut self, engine: &E, log: &ActivityLog, id: Option<&str>)
    where
        E: CollectionEngine + ?Sized,
    {
        self.data.clear();
        let Some(id) = id.filter(|s| !s.is_empty()) else {
            self.selected = None;
            return;
        };
        self.selected = Some(id.to_string());
        match engine.fetch_series_data(id).await {
            Ok(points) => self.data = points,
            Err(err) => log.error(format!("Erro ao carregar dados da série: {err}")),
        }
    }

    /// Exports the selected series. `None` when nothing is selected or the
    /// call failed at the transport level.
    pub async fn export<E>(
        &self,
        engine: &E,
        log: &ActivityLog,
        format: ExportFormat,
    ) -> Option<ExportOutcome>
    where
        E: CollectionEngine + ?Sized,
    {
        let id = self.selected.as_deref()?;
        log.info(format!(
            "Exportando {id} para {}...",
            format.as_str().to_uppercase()
        ));
        match engine.export_series(id, format).await {
            Ok(outcome) => {
                if outcome.success {
                    log.success(format!(
                        "Arquivo salvo em: {}",
                        outcome.path.as_deref().unwrap_or_default()
                    ));
                } else {
                    log.error(format!(
                        "Erro na exportação: {}",
                        outcome.error.as_deref().unwrap_or_default()
                    ));
                }
                Some(outcome)
            }
            Err(err) => {
                log.error(format!("Erro ao exportar: {err}"));
                None
            }
        }
    }
}
