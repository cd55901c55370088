//! Session driver.
//!
//! Hosts an [`OperatorSession`] on one tokio task and multiplexes operator
//! commands, engine events and the debounce tick with `tokio::select!`. Each
//! command runs to completion before the next event is looked at, so the
//! session never observes interleaved operations.

use std::sync::Arc;

use coletor_core::messages::{ExportFormat, ExportOutcome};
use coletor_core::{CollectionEngine, EngineEvent, ExitDecision, RenderedForm};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::activity::ActivityLog;
use crate::lifecycle::LifecycleController;
use crate::session::{Notice, OperatorSession, Section, StartOutcome};

/// Failures of the driver itself, as opposed to failures of an operation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("session driver is not running")]
    NotRunning,
    #[error("session driver stopped before replying")]
    ReplyDropped,
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Operator action forwarded to the session.
#[derive(Debug, Clone)]
pub enum Command {
    Activate(Section),
    SelectEndpoint(Option<String>),
    Input { field: String, value: String },
    Blur(String),
    SaveBulletinFilters,
    AddSeries {
        code: String,
        base_name: String,
        periodicity: String,
    },
    /// Sent only after the operator confirmed the removal prompt.
    RemoveSeries(String),
    SaveSeries,
    StartSeries,
    StartBulletin,
    SelectSeries(Option<String>),
    Export(ExportFormat),
    ClearLog,
    RequestExit,
}

/// Session's answer to a [`Command`].
#[derive(Debug, Clone)]
pub enum Reply {
    Done,
    Rendered(Option<RenderedForm>),
    Valid(bool),
    Notice(Notice),
    Removed(bool),
    Start(StartOutcome),
    Exported(Option<ExportOutcome>),
    Exit(ExitDecision),
}

type Envelope = (Command, oneshot::Sender<Reply>);

// ---------------------------------------------------------------------------
// SessionDriver
// ---------------------------------------------------------------------------

/// Handle to a running session task.
pub struct SessionDriver<E: CollectionEngine + ?Sized + 'static> {
    tx: Option<mpsc::Sender<Envelope>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<OperatorSession<E>>>,
    log: ActivityLog,
    lifecycle: Arc<LifecycleController>,
}

impl<E: CollectionEngine + ?Sized + 'static> SessionDriver<E> {
    /// Spawns the session task.
    ///
    /// `events` carries engine notifications; the driver keeps running after
    /// the engine drops its sender.
    pub fn start(mut session: OperatorSession<E>, mut events: mpsc::Receiver<EngineEvent>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(session.config().command_channel_capacity.max(1));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let log = session.log().clone();
        let lifecycle = Arc::clone(session.lifecycle());
        let tick = session.config().tick_interval.max(std::time::Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut tick_interval = tokio::time::interval(tick);
            tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Skip the first immediate tick.
            tick_interval.tick().await;
            let mut events_open = true;

            loop {
                tokio::select! {
                    envelope = rx.recv() => {
                        let Some((command, reply)) = envelope else {
                            break; // All handles dropped.
                        };
                        let answer = dispatch(&mut session, command).await;
                        // The caller may have stopped waiting.
                        let _ = reply.send(answer);
                    }
                    event = events.recv(), if events_open => {
                        match event {
                            Some(event) => session.on_engine_event(event).await,
                            None => {
                                debug!("engine event channel closed");
                                events_open = false;
                            }
                        }
                    }
                    _ = tick_interval.tick() => {
                        session.poll(now());
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }
            session
        });

        Self {
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            log,
            lifecycle,
        }
    }

    /// Activity log shared with the session.
    #[must_use]
    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Lifecycle slot shared with the session.
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        &self.lifecycle
    }

    /// Sends a command and waits for the session's reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver has been stopped or its task ended.
    pub async fn request(&self, command: Command) -> Result<Reply, DriverError> {
        let tx = self.tx.as_ref().ok_or(DriverError::NotRunning)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send((command, reply_tx))
            .await
            .map_err(|_| DriverError::NotRunning)?;
        reply_rx.await.map_err(|_| DriverError::ReplyDropped)
    }

    /// Stops the task and hands the session back.
    ///
    /// A panic inside the task is written to the activity log before the join
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotRunning`] when already stopped, or
    /// [`DriverError::Join`] when the task panicked or was cancelled.
    pub async fn stop(&mut self) -> Result<OperatorSession<E>, DriverError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.tx.take();
        let handle = self.handle.take().ok_or(DriverError::NotRunning)?;
        match handle.await {
            Ok(session) => Ok(session),
            Err(err) => {
                error!(error = %err, "session task failed");
                self.log.error(format!("Erro não tratado: {err}"));
                Err(DriverError::Join(err))
            }
        }
    }
}

/// Current time on the tokio clock, so paused-time tests drive debouncing.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn dispatch<E: CollectionEngine + ?Sized>(
    session: &mut OperatorSession<E>,
    command: Command,
) -> Reply {
    match command {
        Command::Activate(section) => Reply::Rendered(session.activate(section).await),
        Command::SelectEndpoint(key) => {
            Reply::Rendered(Some(session.select_endpoint(key.as_deref())))
        }
        Command::Input { field, value } => {
            Reply::Valid(session.bulletin_input(&field, &value, now()))
        }
        Command::Blur(field) => Reply::Valid(session.bulletin_blur(&field)),
        Command::SaveBulletinFilters => Reply::Notice(session.save_bulletin_filters().await),
        Command::AddSeries {
            code,
            base_name,
            periodicity,
        } => Reply::Notice(session.add_series(&code, &base_name, &periodicity)),
        Command::RemoveSeries(code) => Reply::Removed(session.remove_series(&code, true)),
        Command::SaveSeries => Reply::Notice(session.save_series_config().await),
        Command::StartSeries => Reply::Start(session.start_series_collection().await),
        Command::StartBulletin => Reply::Start(session.start_bulletin_collection().await),
        Command::SelectSeries(id) => {
            session.select_series(id.as_deref()).await;
            Reply::Done
        }
        Command::Export(format) => Reply::Exported(session.export_series(format).await),
        Command::ClearLog => {
            session.clear_log();
            Reply::Done
        }
        Command::RequestExit => Reply::Exit(session.request_exit()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use coletor_core::{JobKind, LifecycleState};

    use super::*;
    use crate::config::AppConfig;
    use crate::testing::ScriptedEngine;

    const SELIC: &str = "ExpectativasMercadoSelic";

    fn start_driver(
        engine: &Arc<ScriptedEngine>,
    ) -> (SessionDriver<ScriptedEngine>, mpsc::Sender<EngineEvent>) {
        let config = AppConfig {
            current_year: Some(2025),
            ..AppConfig::default()
        };
        let session = OperatorSession::new(Arc::clone(engine), config);
        let (events_tx, events_rx) = mpsc::channel(16);
        (SessionDriver::start(session, events_rx), events_tx)
    }

    async fn input(driver: &SessionDriver<ScriptedEngine>, field: &str, value: &str) {
        driver
            .request(Command::Input {
                field: field.into(),
                value: value.into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn full_bulletin_flow_through_driver() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let (mut driver, events) = start_driver(&engine);

        driver.request(Command::Activate(Section::BulletinSettings)).await.unwrap();
        driver
            .request(Command::SelectEndpoint(Some(SELIC.into())))
            .await
            .unwrap();
        input(&driver, "Data", "2024-01-01").await;
        input(&driver, "Reuniao", "R255").await;

        let reply = driver.request(Command::StartBulletin).await.unwrap();
        assert!(matches!(reply, Reply::Start(StartOutcome::Started(JobKind::Bulletin))));
        assert_eq!(driver.lifecycle().state(), LifecycleState::Running(JobKind::Bulletin));

        let reply = driver.request(Command::RequestExit).await.unwrap();
        assert!(matches!(reply, Reply::Exit(ExitDecision::Confirm(_))));

        let mut changes = driver.lifecycle().subscribe();
        events
            .send(EngineEvent::CollectionFinished { kind: JobKind::Bulletin })
            .await
            .unwrap();
        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow(), LifecycleState::Idle);

        let session = driver.stop().await.unwrap();
        assert!(!session.lifecycle().is_running());
        assert_eq!(engine.bulletin_starts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_edit_stays_pending() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let (mut driver, _events) = start_driver(&engine);

        driver.request(Command::Activate(Section::BulletinSettings)).await.unwrap();
        driver
            .request(Command::SelectEndpoint(Some(SELIC.into())))
            .await
            .unwrap();
        input(&driver, "Reuniao", "R2").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        input(&driver, "Reuniao", "R255").await;

        // First edit's deadline has passed, second one's has not.
        tokio::time::sleep(Duration::from_millis(250)).await;
        let session = driver.stop().await.unwrap();
        let form = session.bulletin_form().unwrap();
        assert!(form.next_deadline().is_some());
        assert!(form.error("Reuniao").is_none());
        assert_eq!(form.value("Reuniao"), Some("R255"));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_reports_error_for_last_edit() {
        let engine = Arc::new(ScriptedEngine::with_builtin_catalog());
        let (mut driver, _events) = start_driver(&engine);

        driver.request(Command::Activate(Section::BulletinSettings)).await.unwrap();
        driver
            .request(Command::SelectEndpoint(Some(SELIC.into())))
            .await
            .unwrap();
        input(&driver, "Reuniao", "R255").await;
        input(&driver, "Reuniao", "R25").await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let session = driver.stop().await.unwrap();
        assert!(session.bulletin_error("Reuniao").is_some());
    }

    #[tokio::test]
    async fn engine_log_events_reach_activity_log() {
        let engine = Arc::new(ScriptedEngine::new());
        let (mut driver, events) = start_driver(&engine);
        events
            .send(EngineEvent::LogMessage {
                message: "Série 433 coletada com sucesso".into(),
                severity: None,
            })
            .await
            .unwrap();
        let log = driver.log().clone();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !log.entries().iter().any(|e| e.message.contains("433")) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(log.last().unwrap().severity, coletor_core::Severity::Success);
        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn requests_after_stop_fail() {
        let engine = Arc::new(ScriptedEngine::new());
        let (mut driver, _events) = start_driver(&engine);
        driver.stop().await.unwrap();
        assert!(matches!(
            driver.request(Command::ClearLog).await,
            Err(DriverError::NotRunning)
        ));
        assert!(matches!(driver.stop().await, Err(DriverError::NotRunning)));
    }

    #[tokio::test]
    async fn driver_survives_closed_event_channel() {
        let engine = Arc::new(ScriptedEngine::new());
        let (mut driver, events) = start_driver(&engine);
        drop(events);
        let reply = driver.request(Command::StartSeries).await.unwrap();
        assert!(matches!(reply, Reply::Start(StartOutcome::Started(JobKind::Series))));
        driver.stop().await.unwrap();
    }
}
