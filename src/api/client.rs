use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{
    BackupListResponse, RestoreTodayResponse, SettingsResponse, SevenDayStats, WorkHourSettings,
    WorkHourStats,
};
use super::PlanApi;
use crate::config::AutosaveConfig;
use crate::error::AutosaveError;
use crate::plan::{BackupEntry, PlanSnapshot, SaveResponse};

const USER_AGENT: &str = concat!("dayplan-autosave/", env!("CARGO_PKG_VERSION"));

/// JSON-over-HTTP client for the planner backend.
pub struct HttpPlanApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpPlanApi {
    /// Create a client rooted at `base_url` with the given per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AutosaveError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Self::with_client(client, base_url)
    }

    pub fn from_config(config: &AutosaveConfig) -> Result<Self, AutosaveError> {
        Self::new(&config.server.base_url, config.request_timeout())
    }

    /// Use a preconfigured reqwest client (cookies, proxies, auth headers).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, AutosaveError> {
        // Url::join drops the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .map_err(|e| AutosaveError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, AutosaveError> {
        self.base
            .join(path)
            .map_err(|e| AutosaveError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Decode a JSON body. 5xx answers are reported as server errors without
    /// looking at the body.
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T, AutosaveError> {
        let status = response.status();
        if status.is_server_error() {
            warn!("{} returned HTTP {}", what, status.as_u16());
            return Err(AutosaveError::Server(status.as_u16()));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            AutosaveError::Decode(format!("{} (HTTP {}): {}", what, status.as_u16(), e))
        })
    }

    /// `GET /api/seven-day-stats?date=`.
    pub async fn seven_day_stats(&self, date: NaiveDate) -> Result<SevenDayStats, AutosaveError> {
        let response = self
            .client
            .get(self.endpoint("api/seven-day-stats")?)
            .query(&[("date", date.to_string())])
            .send()
            .await?;
        let stats: SevenDayStats = Self::read_json(response, "seven-day stats").await?;
        if !stats.success {
            return Err(AutosaveError::Rejected(
                stats.error.unwrap_or_else(|| "Failed to load 7-day stats".to_string()),
            ));
        }
        Ok(stats)
    }

    /// `GET /api/work-hour-stats`, for the given day or the backend's today.
    pub async fn work_hour_stats(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<WorkHourStats, AutosaveError> {
        let mut request = self.client.get(self.endpoint("api/work-hour-stats")?);
        if let Some(date) = date {
            request = request.query(&[("date", date.to_string())]);
        }
        let stats: WorkHourStats = Self::read_json(request.send().await?, "work-hour stats").await?;
        if !stats.success {
            return Err(AutosaveError::Rejected("Failed to load work-hour stats".to_string()));
        }
        Ok(stats)
    }

    /// `POST /api/work-hour-settings`.
    pub async fn save_work_hour_settings(
        &self,
        settings: WorkHourSettings,
    ) -> Result<(), AutosaveError> {
        let response = self
            .client
            .post(self.endpoint("api/work-hour-settings")?)
            .json(&settings)
            .send()
            .await?;
        let result: SettingsResponse = Self::read_json(response, "work-hour settings").await?;
        if !result.success {
            return Err(AutosaveError::Rejected(
                result.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        info!(
            "Saved work-hour goals: weekly {}, monthly {}",
            settings.weekly_goal, settings.monthly_goal
        );
        Ok(())
    }
}

impl PlanApi for HttpPlanApi {
    async fn save_plan(&self, snapshot: &PlanSnapshot) -> Result<SaveResponse, AutosaveError> {
        debug!(
            "Posting plan for {} ({} priorities, {} blocks)",
            snapshot.date,
            snapshot.priorities.len(),
            snapshot.time_blocks.len()
        );
        let response = self
            .client
            .post(self.endpoint("api/daily-plan")?)
            .json(snapshot)
            .send()
            .await?;
        Self::read_json(response, "daily plan save").await
    }

    async fn list_backups(&self, date: NaiveDate) -> Result<Vec<BackupEntry>, AutosaveError> {
        let response = self
            .client
            .get(self.endpoint("api/daily-plan/backup")?)
            .query(&[("date", date.to_string())])
            .send()
            .await?;
        let list: BackupListResponse = Self::read_json(response, "backup list").await?;
        if !list.success {
            return Err(AutosaveError::Rejected(
                list.error.unwrap_or_else(|| "Backup lookup failed".to_string()),
            ));
        }
        Ok(list.backup_data)
    }

    async fn restore_today(&self) -> Result<RestoreTodayResponse, AutosaveError> {
        let response = self
            .client
            .post(self.endpoint("api/restore-today-plan")?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Self::read_json(response, "restore today").await
    }
}
