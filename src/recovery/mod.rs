//! Browsing and restoring earlier copies of a day's plan.
//!
//! Both restore paths overwrite data and are gated behind [`Confirm`].

pub mod types;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::api::{PlanApi, RestoreTodayResponse};
use crate::autosave::{AutosaveController, UiEvent};
use crate::error::AutosaveError;
use crate::plan::BackupEntry;

pub use types::{BackupSummary, RestoreOutcome};

/// Asks the user to approve an irreversible action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub struct RecoveryFlow<'a, A: PlanApi> {
    controller: &'a AutosaveController<A>,
}

impl<'a, A: PlanApi> RecoveryFlow<'a, A> {
    pub(crate) fn new(controller: &'a AutosaveController<A>) -> Self {
        Self { controller }
    }

    /// Recent backups for `date`, newest first.
    pub async fn list_backups(&self, date: NaiveDate) -> Result<Vec<BackupEntry>, AutosaveError> {
        let mut backups = self.controller.api().list_backups(date).await?;
        backups.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        info!("Found {} backups for {}", backups.len(), date);
        Ok(backups)
    }

    pub fn summarize(backups: &[BackupEntry]) -> Vec<BackupSummary> {
        backups.iter().map(BackupSummary::from).collect()
    }

    /// Overwrite the form with `backup` and save it right away.
    pub async fn restore(&self, backup: &BackupEntry, confirm: &impl Confirm) -> RestoreOutcome {
        let summary = BackupSummary::from(backup);
        let prompt = format!(
            "Restore data from {} ({})? This will overwrite current data.",
            summary.date,
            summary.updated_at.format("%Y-%m-%d %H:%M")
        );
        if !confirm.confirm(&prompt) {
            info!("Restore of backup from {} declined", summary.updated_at);
            return RestoreOutcome::Declined;
        }

        self.controller.shared().form().apply_backup(backup);
        info!(
            "Restored backup from {} ({} priorities, {} scheduled blocks)",
            summary.updated_at, summary.priority_count, summary.assigned_block_count
        );

        let save = self.controller.save_now().await;
        if !save.is_saved() {
            warn!("Restored plan was not saved: {:?}", save);
        }
        RestoreOutcome::Restored { summary, save }
    }

    /// Ask the backend to restore today's plan from its own earlier copy.
    /// Returns `None` when the user declines.
    ///
    /// Unsaved edits are dropped first so they cannot be posted over the
    /// restored plan; they are re-armed if the restore does not happen. On
    /// success the form is refreshed from the newest backup.
    pub async fn restore_today(
        &self,
        confirm: &impl Confirm,
    ) -> Result<Option<RestoreTodayResponse>, AutosaveError> {
        if !confirm.confirm(
            "Restore your daily plan from earlier today? This will overwrite any current changes.",
        ) {
            return Ok(None);
        }

        let had_edits = self.controller.discard_pending().await;
        let result = match self.controller.api().restore_today().await {
            Ok(result) if result.success => result,
            Ok(_) => {
                self.rearm(had_edits);
                return Err(AutosaveError::Rejected(
                    "No previous data found to restore for today".to_string(),
                ));
            }
            Err(e) => {
                self.rearm(had_edits);
                return Err(e);
            }
        };
        info!(
            "Server restored today's plan with {} priorities and {} scheduled blocks",
            result.priorities_count, result.time_blocks_count
        );

        self.resync().await;
        Ok(Some(result))
    }

    fn rearm(&self, had_edits: bool) {
        if had_edits {
            self.controller.record_mutation();
        }
    }

    /// Load the newest server copy into the form without recording a
    /// mutation. When that is not possible the UI is told to reload.
    async fn resync(&self) {
        let shared = self.controller.shared();
        let date = shared.form_date();
        let newest = match self.controller.api().list_backups(date).await {
            Ok(backups) => backups.into_iter().max_by_key(|b| b.updated_at),
            Err(e) => {
                warn!("Could not fetch the restored plan: {}", e);
                shared.events.emit(UiEvent::ReloadRequired {
                    reason: format!("Plan was restored on the server but could not be loaded: {}", e),
                });
                return;
            }
        };

        match newest {
            Some(backup) => {
                shared.form().apply_backup(&backup);
                shared.set_last_observed(backup.updated_at);
                info!("Form refreshed from server copy of {}", backup.updated_at);
            }
            None => {
                warn!("Server restored {} but lists no copy of it", date);
                shared.events.emit(UiEvent::ReloadRequired {
                    reason: "Plan was restored on the server".to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backup(brain_dump: Option<&str>) -> BackupEntry {
        let mut entry: BackupEntry = serde_json::from_str(
            r#"{
                "date": "2024-03-01",
                "updated_at": "2024-03-01T10:00:00Z",
                "priorities": [{"content": "a"}, {"content": "b"}],
                "time_blocks": [
                    {"start_time": "09:00", "end_time": "09:15", "task_id": 1},
                    {"start_time": "09:15", "end_time": "09:30"}
                ]
            }"#,
        )
        .unwrap();
        entry.brain_dump = brain_dump.map(str::to_string);
        entry
    }

    #[test]
    fn test_summary_counts() {
        let summary = BackupSummary::from(&backup(None));
        assert_eq!(summary.priority_count, 2);
        assert_eq!(summary.assigned_block_count, 1);
        assert!(summary.note_preview.is_none());
    }

    #[test]
    fn test_summary_preview_truncates() {
        let long = "x".repeat(80);
        let summary = BackupSummary::from(&backup(Some(&long)));
        let preview = summary.note_preview.unwrap();
        assert_eq!(preview, format!("{}...", "x".repeat(50)));

        let short = BackupSummary::from(&backup(Some("call mom")));
        assert_eq!(short.note_preview.as_deref(), Some("call mom"));

        let blank = BackupSummary::from(&backup(Some("   ")));
        assert!(blank.note_preview.is_none());
    }

    #[test]
    fn test_closure_confirm() {
        let yes = |_: &str| true;
        let no = |prompt: &str| prompt.is_empty();
        assert!(yes.confirm("Restore?"));
        assert!(!no.confirm("Restore?"));
    }
}
