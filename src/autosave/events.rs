use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Something the UI layer should show or hide.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiEvent {
    /// Transient "saved" indicator.
    Saved { at: DateTime<Utc> },
    /// Auto-dismiss of the indicator shown for the save at `at`. A UI that
    /// has since shown a newer save should ignore it.
    SavedIndicatorCleared { at: DateTime<Utc> },
    /// Persistent indicator after the retries ran out.
    SaveFailed { reason: String },
    /// Dismissible banner offering to reload or keep editing.
    ConflictWarning { server_updated_at: Option<DateTime<Utc>> },
    /// Inline message for input that was never sent.
    ValidationFailed { reason: String },
    /// The server changed the plan and the form could not be refreshed from
    /// it. The UI should reload before any further edits.
    ReloadRequired { reason: String },
}

/// Sending half of the UI event stream. Events are dropped when nobody listens.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

pub type UiEvents = mpsc::UnboundedReceiver<UiEvent>;

impl EventSink {
    pub fn channel() -> (Self, UiEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: UiEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("No UI listener for {:?}", e.0);
        }
    }
}
