use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::conflict::ConflictDetector;
use super::cooldown::ConflictGate;
use super::events::{EventSink, UiEvent, UiEvents};
use super::{RetryPolicy, SaveOutcome, Shared};
use crate::api::PlanApi;
use crate::clock::{Clock, SystemClock};
use crate::config::AutosaveConfig;
use crate::error::AutosaveError;
use crate::plan::FormState;
use crate::recovery::RecoveryFlow;

enum Command {
    Mutation,
    SaveNow(oneshot::Sender<SaveOutcome>),
    Discard(oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<Option<SaveOutcome>>),
}

/// Owns the autosave state for one editing session.
///
/// Must be started inside a tokio runtime. Dropping the controller stops the
/// worker once its current save settles.
pub struct AutosaveController<A: PlanApi> {
    api: Arc<A>,
    shared: Arc<Shared>,
    config: AutosaveConfig,
    tx: mpsc::UnboundedSender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
    detector: Mutex<Option<JoinHandle<()>>>,
}

impl<A: PlanApi> AutosaveController<A> {
    pub fn start(api: Arc<A>, form: FormState, config: AutosaveConfig) -> (Self, UiEvents) {
        Self::start_with_clock(api, form, config, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        api: Arc<A>,
        form: FormState,
        config: AutosaveConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, UiEvents) {
        let (events, ui_events) = EventSink::channel();
        let shared = Arc::new(Shared {
            form: Mutex::new(form),
            last_observed: Mutex::new(clock.now()),
            gate: ConflictGate::new(config.conflict_cooldown()),
            events,
            clock,
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = SaveWorker {
            api: api.clone(),
            shared: shared.clone(),
            rx,
            debounce: config.debounce(),
            policy: config.retry_policy(),
            periodic: config.periodic_save(),
            indicator_ttl: config.saved_indicator(),
            dirty: false,
        };
        let handle = tokio::spawn(worker.run());
        info!(
            "Autosave started (debounce {:?}, {} attempts)",
            config.debounce(),
            config.save.max_attempts
        );

        let controller = Self {
            api,
            shared,
            config,
            tx,
            worker: Mutex::new(Some(handle)),
            detector: Mutex::new(None),
        };
        (controller, ui_events)
    }

    /// Note that a form field changed; (re)arms the debounce timer.
    pub fn record_mutation(&self) {
        if self.tx.send(Command::Mutation).is_err() {
            warn!("Mutation recorded after autosave stopped");
        }
    }

    /// Apply a change to the form state and record it as a mutation.
    ///
    /// The form stays locked while `f` runs, so `f` must not call back into
    /// the controller (`form`, `edit`, `save_now`); doing so deadlocks.
    pub fn edit<R>(&self, f: impl FnOnce(&mut FormState) -> R) -> R {
        let result = {
            let mut form = self.shared.form();
            f(&mut form)
        };
        self.record_mutation();
        result
    }

    /// Copy of the current form state.
    pub fn form(&self) -> FormState {
        self.shared.form().clone()
    }

    pub fn last_observed_update(&self) -> DateTime<Utc> {
        self.shared.last_observed()
    }

    /// Record the update time of server data the client has just loaded.
    pub fn set_last_observed_update(&self, at: DateTime<Utc>) {
        self.shared.set_last_observed(at);
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    /// Save immediately, replacing any pending debounce. Waits for the
    /// current save to settle first if one is in flight.
    pub async fn save_now(&self) -> SaveOutcome {
        let (reply, outcome) = oneshot::channel();
        if self.tx.send(Command::SaveNow(reply)).is_err() {
            return SaveOutcome::Failed(AutosaveError::WorkerStopped.to_string());
        }
        outcome
            .await
            .unwrap_or_else(|_| SaveOutcome::Failed(AutosaveError::WorkerStopped.to_string()))
    }

    /// Drop the pending debounce and forget unsaved edits, for when the
    /// server copy is about to replace the form. Waits for an in-flight save
    /// to settle. Returns whether there was anything to drop.
    pub(crate) async fn discard_pending(&self) -> bool {
        let (reply, dropped) = oneshot::channel();
        if self.tx.send(Command::Discard(reply)).is_err() {
            return false;
        }
        dropped.await.unwrap_or(false)
    }

    /// A conflict detector sharing this controller's state and cooldown.
    pub fn conflict_detector(&self) -> ConflictDetector<A> {
        ConflictDetector::new(
            self.api.clone(),
            self.shared.clone(),
            self.config.conflict_poll_interval(),
            self.config.stale_threshold(),
        )
    }

    /// Start polling for edits made elsewhere. Replaces a running poller.
    pub fn spawn_conflict_detector(&self) {
        let handle = tokio::spawn(self.conflict_detector().run());
        if let Some(previous) = self.detector.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    pub fn recovery(&self) -> RecoveryFlow<'_, A> {
        RecoveryFlow::new(self)
    }

    pub(crate) fn api(&self) -> &A {
        &self.api
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Page-unload path: make a final save if there are unsaved edits, then
    /// stop the worker and the conflict poller. Returns that save's outcome.
    pub async fn shutdown(&self) -> Option<SaveOutcome> {
        if let Some(detector) = self.detector.lock().unwrap().take() {
            detector.abort();
        }

        let (reply, outcome) = oneshot::channel();
        let final_save = if self.tx.send(Command::Shutdown(reply)).is_ok() {
            outcome.await.ok().flatten()
        } else {
            None
        };

        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Autosave worker ended abnormally: {}", e);
            }
        }
        info!("Autosave stopped");
        final_save
    }
}

impl<A: PlanApi> Drop for AutosaveController<A> {
    fn drop(&mut self) {
        if let Ok(mut detector) = self.detector.lock() {
            if let Some(handle) = detector.take() {
                handle.abort();
            }
        }
    }
}

/// How one save cycle ended, before it is reported.
enum CycleEnd {
    Done(SaveOutcome),
    Invalid(String),
    Exhausted(String),
}

struct SaveWorker<A: PlanApi> {
    api: Arc<A>,
    shared: Arc<Shared>,
    rx: mpsc::UnboundedReceiver<Command>,
    debounce: Duration,
    policy: RetryPolicy,
    periodic: Option<Duration>,
    indicator_ttl: Duration,
    /// Edits made since the last save that reached the server or was rejected as invalid.
    dirty: bool,
}

impl<A: PlanApi> SaveWorker<A> {
    async fn run(mut self) {
        let mut deadline: Option<Instant> = None;
        let mut periodic = self.periodic.map(|period| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(Command::Mutation) => {
                        self.dirty = true;
                        deadline = Some(Instant::now() + self.debounce);
                        debug!("Autosave armed for {:?}", self.debounce);
                    }
                    Some(Command::SaveNow(reply)) => {
                        deadline = None;
                        let outcome = self.save_cycle(&mut periodic).await;
                        let _ = reply.send(outcome);
                    }
                    Some(Command::Discard(reply)) => {
                        let dropped = self.dirty || deadline.is_some();
                        deadline = None;
                        self.dirty = false;
                        if dropped {
                            debug!("Discarded unsaved edits");
                        }
                        let _ = reply.send(dropped);
                    }
                    Some(Command::Shutdown(reply)) => {
                        let outcome = if self.dirty {
                            Some(self.save_cycle(&mut periodic).await)
                        } else {
                            None
                        };
                        let _ = reply.send(outcome);
                        break;
                    }
                    None => break,
                },
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.save_cycle(&mut periodic).await;
                }
                _ = next_tick(&mut periodic), if self.dirty && deadline.is_none() => {
                    debug!("Periodic save of unsaved edits");
                    self.save_cycle(&mut periodic).await;
                }
            }
        }
        debug!("Autosave worker exiting");
    }

    async fn save_cycle(&mut self, periodic: &mut Option<Interval>) -> SaveOutcome {
        self.dirty = false;
        let outcome = match self.save_with_retry().await {
            CycleEnd::Done(SaveOutcome::Saved(at)) => {
                self.shared.events.emit(UiEvent::Saved { at });
                let events = self.shared.events.clone();
                let ttl = self.indicator_ttl;
                tokio::spawn(async move {
                    time::sleep(ttl).await;
                    events.emit(UiEvent::SavedIndicatorCleared { at });
                });
                SaveOutcome::Saved(at)
            }
            CycleEnd::Done(SaveOutcome::Conflict(server_updated_at)) => {
                self.shared.raise_conflict(server_updated_at);
                SaveOutcome::Conflict(server_updated_at)
            }
            CycleEnd::Done(failed) => failed,
            CycleEnd::Invalid(reason) => {
                self.shared
                    .events
                    .emit(UiEvent::ValidationFailed { reason: reason.clone() });
                SaveOutcome::Failed(reason)
            }
            CycleEnd::Exhausted(reason) => {
                self.dirty = true;
                self.shared
                    .events
                    .emit(UiEvent::SaveFailed { reason: reason.clone() });
                SaveOutcome::Failed(reason)
            }
        };
        if let Some(ticker) = periodic.as_mut() {
            ticker.reset();
        }
        outcome
    }

    async fn save_with_retry(&self) -> CycleEnd {
        let mut attempt = 1;
        loop {
            let snapshot = match self.shared.snapshot() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Autosave skipped: {}", e);
                    return CycleEnd::Invalid(e.to_string());
                }
            };

            let error = match self.api.save_plan(&snapshot).await {
                Ok(response) if response.is_success() => {
                    let now = self.shared.clock.now();
                    self.shared.set_last_observed(now);
                    info!("Auto-saved plan for {} (attempt {})", snapshot.date, attempt);
                    return CycleEnd::Done(SaveOutcome::Saved(now));
                }
                Ok(response) if response.conflict => {
                    warn!("Save rejected: server has newer data for {}", snapshot.date);
                    return CycleEnd::Done(SaveOutcome::Conflict(response.updated_at));
                }
                Ok(response) => AutosaveError::Rejected(
                    response.error.unwrap_or_else(|| "Save failed".to_string()),
                ),
                Err(e) => e,
            };

            if !error.is_transient() {
                error!("Auto-save failed: {}", error);
                return CycleEnd::Exhausted(error.to_string());
            }
            if !self.policy.should_retry(attempt) {
                error!("Auto-save failed after {} attempts: {}", attempt, error);
                return CycleEnd::Exhausted(error.to_string());
            }

            let delay = self.policy.delay_before_retry(attempt);
            warn!(
                "Auto-save retry {}/{} in {:?}: {}",
                attempt,
                self.policy.max_attempts() - 1,
                delay,
                error
            );
            time::sleep(delay).await;
            attempt += 1;
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}
