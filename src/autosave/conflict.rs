use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Shared;
use crate::api::PlanApi;

/// Result of one poll of the backup endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictCheck {
    /// A warning was shown recently; the backend was not asked.
    CoolingDown,
    NoBackups,
    UpToDate,
    /// The warning was raised for a backup updated at this time.
    Conflict(DateTime<Utc>),
    /// The poll failed. Advisory only, so this is logged and dropped.
    Unavailable(String),
}

/// True when the server copy is newer than what the client last saw by more
/// than `threshold`.
pub fn is_stale(
    server_updated_at: DateTime<Utc>,
    last_observed: DateTime<Utc>,
    threshold: chrono::Duration,
) -> bool {
    server_updated_at - last_observed > threshold
}

/// Polls for edits made to the same day from another session.
pub struct ConflictDetector<A: PlanApi> {
    api: Arc<A>,
    shared: Arc<Shared>,
    interval: Duration,
    threshold: chrono::Duration,
}

impl<A: PlanApi> ConflictDetector<A> {
    pub(crate) fn new(
        api: Arc<A>,
        shared: Arc<Shared>,
        interval: Duration,
        threshold: chrono::Duration,
    ) -> Self {
        Self {
            api,
            shared,
            interval,
            threshold,
        }
    }

    pub async fn check_once(&self) -> ConflictCheck {
        if self.shared.gate.is_cooling_down() {
            debug!("Skipping conflict check, warning shown recently");
            return ConflictCheck::CoolingDown;
        }

        let date = self.shared.form_date();
        let backups = match self.api.list_backups(date).await {
            Ok(backups) => backups,
            Err(e) => {
                warn!("Conflict check failed: {}", e);
                return ConflictCheck::Unavailable(e.to_string());
            }
        };

        let Some(latest) = backups.iter().map(|b| b.updated_at).max() else {
            return ConflictCheck::NoBackups;
        };

        let last_observed = self.shared.last_observed();
        if !is_stale(latest, last_observed, self.threshold) {
            return ConflictCheck::UpToDate;
        }

        info!(
            "Plan for {} was updated elsewhere at {} (last seen {})",
            date, latest, last_observed
        );
        if self.shared.raise_conflict(Some(latest)) {
            ConflictCheck::Conflict(latest)
        } else {
            ConflictCheck::CoolingDown
        }
    }

    /// Poll forever on the configured interval, starting one interval from now.
    pub async fn run(self) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}
