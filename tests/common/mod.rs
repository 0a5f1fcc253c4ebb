#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::time::Instant;

use dayplan_autosave::api::{PlanApi, RestoreTodayResponse};
use dayplan_autosave::autosave::{UiEvent, UiEvents};
use dayplan_autosave::clock::ManualClock;
use dayplan_autosave::config::default_config;
use dayplan_autosave::plan::{BackupEntry, FormState, PlanSnapshot, SaveResponse};
use dayplan_autosave::{AutosaveConfig, AutosaveController, AutosaveError};

/// Scripted in-memory backend. Unscripted saves succeed.
#[derive(Default)]
pub struct FakeApi {
    save_script: Mutex<VecDeque<Result<SaveResponse, AutosaveError>>>,
    saves: Mutex<Vec<(Instant, PlanSnapshot)>>,
    save_latency: Mutex<Duration>,
    backups: Mutex<Vec<BackupEntry>>,
    backups_fail: Mutex<bool>,
    backup_calls: AtomicUsize,
    restore_today: Mutex<RestoreTodayResponse>,
    restore_today_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_save(&self, result: Result<SaveResponse, AutosaveError>) {
        self.save_script.lock().unwrap().push_back(result);
    }

    pub fn set_save_latency(&self, latency: Duration) {
        *self.save_latency.lock().unwrap() = latency;
    }

    pub fn set_backups(&self, backups: Vec<BackupEntry>) {
        *self.backups.lock().unwrap() = backups;
    }

    pub fn fail_backups(&self) {
        *self.backups_fail.lock().unwrap() = true;
    }

    pub fn set_restore_today(&self, response: RestoreTodayResponse) {
        *self.restore_today.lock().unwrap() = response;
    }

    pub fn save_times(&self) -> Vec<Instant> {
        self.saves.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn saved_snapshots(&self) -> Vec<PlanSnapshot> {
        self.saves.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn backup_calls(&self) -> usize {
        self.backup_calls.load(Ordering::SeqCst)
    }

    pub fn restore_today_calls(&self) -> usize {
        self.restore_today_calls.load(Ordering::SeqCst)
    }
}

impl PlanApi for FakeApi {
    async fn save_plan(&self, snapshot: &PlanSnapshot) -> Result<SaveResponse, AutosaveError> {
        self.saves
            .lock()
            .unwrap()
            .push((Instant::now(), snapshot.clone()));
        let latency = *self.save_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let scripted = self.save_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(saved()))
    }

    async fn list_backups(&self, _date: NaiveDate) -> Result<Vec<BackupEntry>, AutosaveError> {
        self.backup_calls.fetch_add(1, Ordering::SeqCst);
        if *self.backups_fail.lock().unwrap() {
            return Err(AutosaveError::Server(500));
        }
        Ok(self.backups.lock().unwrap().clone())
    }

    async fn restore_today(&self) -> Result<RestoreTodayResponse, AutosaveError> {
        self.restore_today_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.restore_today.lock().unwrap().clone())
    }
}

pub fn saved() -> SaveResponse {
    serde_json::from_str(r#"{"success": true}"#).unwrap()
}

pub fn conflict() -> SaveResponse {
    serde_json::from_str(r#"{"success": false, "conflict": true}"#).unwrap()
}

pub fn conflict_at(updated_at: &str) -> SaveResponse {
    serde_json::from_value(serde_json::json!({
        "success": false,
        "conflict": true,
        "updated_at": updated_at
    }))
    .unwrap()
}

pub fn rejected(error: &str) -> SaveResponse {
    serde_json::from_value(serde_json::json!({"success": false, "error": error})).unwrap()
}

pub fn plan_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

pub fn slot(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Defaults without the periodic save, so only explicit triggers post.
pub fn test_config() -> AutosaveConfig {
    let mut config = default_config();
    config.save.periodic_save_secs = 0;
    config
}

pub fn start(
    api: &Arc<FakeApi>,
    config: AutosaveConfig,
) -> (AutosaveController<FakeApi>, UiEvents, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(at(9, 0)));
    let form = FormState::with_day_grid(plan_date(), slot(8, 0), slot(18, 0));
    let (controller, events) =
        AutosaveController::start_with_clock(api.clone(), form, config, clock.clone());
    (controller, events, clock)
}

pub fn drain(events: &mut UiEvents) -> Vec<UiEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub fn count_conflict_warnings(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, UiEvent::ConflictWarning { .. }))
        .count()
}

pub fn assert_near(actual: Duration, expected: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= Duration::from_millis(50),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

pub fn backup_json(updated_at: &str, priorities: usize, assigned: usize, unassigned: usize) -> BackupEntry {
    let priorities: Vec<_> = (0..priorities)
        .map(|i| serde_json::json!({"content": format!("priority {}", i + 1), "completed": i == 0, "order": i}))
        .collect();
    let mut blocks = Vec::new();
    for i in 0..(assigned + unassigned) {
        let start = slot(9, 0) + chrono::Duration::minutes(15 * i as i64);
        let end = start + chrono::Duration::minutes(15);
        let task_id = if i < assigned {
            serde_json::json!(100 + i)
        } else {
            serde_json::Value::Null
        };
        blocks.push(serde_json::json!({
            "start_time": start.format("%H:%M").to_string(),
            "end_time": end.format("%H:%M").to_string(),
            "task_id": task_id,
            "notes": format!("block {}", i),
            "completed": false
        }));
    }
    serde_json::from_value(serde_json::json!({
        "date": "2024-03-01",
        "updated_at": updated_at,
        "priorities": priorities,
        "time_blocks": blocks,
        "brain_dump": "restored notes",
        "productivity_rating": 4
    }))
    .unwrap()
}
