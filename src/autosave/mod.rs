//! Debounced autosave with bounded retry and conflict warnings.
//!
//! One worker task per controller owns the debounce deadline and the retry
//! loop, so edits coalesce and at most one save is in flight at a time.

pub mod backoff;
pub mod conflict;
pub mod controller;
pub mod cooldown;
pub mod events;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::clock::Clock;
use crate::error::AutosaveError;
use crate::plan::{FormState, PlanSnapshot};

pub use backoff::RetryPolicy;
pub use conflict::{is_stale, ConflictCheck, ConflictDetector};
pub use controller::AutosaveController;
pub use cooldown::ConflictGate;
pub use events::{EventSink, UiEvent, UiEvents};

/// How a save attempt (including its retries) ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Stored; carries the time recorded as the last observed server state.
    Saved(DateTime<Utc>),
    /// The server holds newer data. Carries its update time when it said so.
    Conflict(Option<DateTime<Utc>>),
    Failed(String),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }
}

/// State shared by the save worker, the conflict detector and recovery.
pub(crate) struct Shared {
    pub(crate) form: Mutex<FormState>,
    pub(crate) last_observed: Mutex<DateTime<Utc>>,
    pub(crate) gate: ConflictGate,
    pub(crate) events: EventSink,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Shared {
    /// Lock the form. A panic in an earlier edit closure leaves the form as
    /// that closure left it; saving carries on with that state.
    pub(crate) fn form(&self) -> MutexGuard<'_, FormState> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn last_observed(&self) -> DateTime<Utc> {
        *self.last_observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_last_observed(&self, at: DateTime<Utc>) {
        *self.last_observed.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub(crate) fn form_date(&self) -> NaiveDate {
        self.form().date()
    }

    pub(crate) fn snapshot(&self) -> Result<PlanSnapshot, AutosaveError> {
        let last_observed = self.last_observed();
        self.form().snapshot(last_observed)
    }

    /// Show the conflict banner unless one was shown within the cooldown.
    pub(crate) fn raise_conflict(&self, server_updated_at: Option<DateTime<Utc>>) -> bool {
        if !self.gate.try_acquire() {
            info!("Conflict warning suppressed, still within cooldown");
            return false;
        }
        self.events.emit(UiEvent::ConflictWarning { server_updated_at });
        true
    }
}
