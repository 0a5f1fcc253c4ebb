use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::autosave::SaveOutcome;
use crate::plan::BackupEntry;

/// Characters of the brain dump shown in a backup summary.
const PREVIEW_CHARS: usize = 50;

/// What the backup picker shows for one backup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSummary {
    pub date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub priority_count: usize,
    pub assigned_block_count: usize,
    pub note_preview: Option<String>,
}

impl From<&BackupEntry> for BackupSummary {
    fn from(backup: &BackupEntry) -> Self {
        let note_preview = backup
            .brain_dump
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| {
                let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
                if text.chars().count() > PREVIEW_CHARS {
                    preview.push_str("...");
                }
                preview
            });

        Self {
            date: backup.date,
            updated_at: backup.updated_at,
            priority_count: backup.priorities.len(),
            assigned_block_count: backup.assigned_block_count(),
            note_preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// The user did not confirm; nothing was changed.
    Declined,
    /// The form now holds the backup and this was the immediate save.
    Restored {
        summary: BackupSummary,
        save: SaveOutcome,
    },
}
