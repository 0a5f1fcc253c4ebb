use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::plan::BackupEntry;

/// Response body of `GET /api/daily-plan/backup`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupListResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub backup_data: Vec<BackupEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response body of `POST /api/restore-today-plan`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RestoreTodayResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub priorities_count: usize,
    #[serde(default)]
    pub time_blocks_count: usize,
}

/// Response body of `GET /api/seven-day-stats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SevenDayStats {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub total_hours: f64,
    #[serde(default)]
    pub work_hours: f64,
    #[serde(default)]
    pub work_progress_percentage: f64,
    #[serde(default)]
    pub error: Option<String>,
}

/// How far work hours are toward the weekly goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    Behind,
    Close,
    Reached,
}

impl SevenDayStats {
    pub fn progress_band(&self) -> ProgressBand {
        if self.work_progress_percentage >= 100.0 {
            ProgressBand::Reached
        } else if self.work_progress_percentage >= 75.0 {
            ProgressBand::Close
        } else {
            ProgressBand::Behind
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryHours {
    #[serde(default)]
    pub seven_day: f64,
    #[serde(default)]
    pub thirty_day: f64,
    #[serde(default)]
    pub work_week: f64,
    #[serde(default)]
    pub color: Option<String>,
}

/// Response body of `GET /api/work-hour-stats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkHourStats {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "default_weekly_goal")]
    pub weekly_goal: f64,
    #[serde(default = "default_monthly_goal")]
    pub monthly_goal: f64,
    #[serde(default)]
    pub work_week_start: Option<NaiveDate>,
    #[serde(default)]
    pub work_week_end: Option<NaiveDate>,
    #[serde(default)]
    pub seven_day_work: f64,
    #[serde(default)]
    pub thirty_day_work: f64,
    #[serde(default)]
    pub category_stats: BTreeMap<String, CategoryHours>,
}

fn default_weekly_goal() -> f64 {
    32.0
}

fn default_monthly_goal() -> f64 {
    140.0
}

impl WorkHourStats {
    /// Hours for a category, zero when the backend did not report it.
    pub fn category(&self, name: &str) -> CategoryHours {
        self.category_stats.get(name).cloned().unwrap_or_default()
    }
}

/// Request body of `POST /api/work-hour-settings`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkHourSettings {
    pub weekly_goal: f64,
    pub monthly_goal: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
