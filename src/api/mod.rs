//! Access to the planner backend.
//!
//! The autosave, conflict detector and recovery flow only talk to the backend
//! through [`PlanApi`], so they can be driven by an in-memory fake in tests.

pub mod client;
pub mod types;

use std::future::Future;

use chrono::NaiveDate;

use crate::error::AutosaveError;
use crate::plan::{BackupEntry, PlanSnapshot, SaveResponse};

pub use client::HttpPlanApi;
pub use types::{
    BackupListResponse, CategoryHours, ProgressBand, RestoreTodayResponse, SevenDayStats,
    WorkHourSettings, WorkHourStats,
};

pub trait PlanApi: Send + Sync + 'static {
    /// `POST /api/daily-plan`. Transport failures and 5xx answers are errors;
    /// any decodable body, including a conflict, is returned as-is.
    fn save_plan(
        &self,
        snapshot: &PlanSnapshot,
    ) -> impl Future<Output = Result<SaveResponse, AutosaveError>> + Send;

    /// `GET /api/daily-plan/backup?date=`, newest first.
    fn list_backups(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<BackupEntry>, AutosaveError>> + Send;

    /// `POST /api/restore-today-plan`.
    fn restore_today(
        &self,
    ) -> impl Future<Output = Result<RestoreTodayResponse, AutosaveError>> + Send;
}
