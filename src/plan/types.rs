use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of every calendar slot.
pub const BLOCK_MINUTES: i64 = 15;

/// Identifier of a task assigned to a time block.
///
/// The backend hands ids out as numbers but the planner form submits them as
/// strings, so both shapes are accepted and it is always sent as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => TaskId(n.to_string()),
            Raw::Str(s) => TaskId(s),
        })
    }
}

/// A priority as sent to and received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRecord {
    pub content: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub order: usize,
}

/// A 15-minute time block as sent to and received from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlockRecord {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
}

/// Everything submitted by one save attempt.
///
/// Built fresh from the form state for each attempt and dropped once the
/// exchange completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub date: NaiveDate,
    pub priorities: Vec<PriorityRecord>,
    pub time_blocks: Vec<TimeBlockRecord>,
    pub brain_dump: String,
    pub productivity_rating: Option<u8>,
    /// Timestamp of the last server state this client has seen.
    pub last_update_check: DateTime<Utc>,
    pub auto_save: bool,
}

/// Response body of `POST /api/daily-plan`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SaveResponse {
    #[serde(default)]
    pub success: bool,
    /// Older backends answer `{"status": "success"}` instead.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conflict: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SaveResponse {
    pub fn is_success(&self) -> bool {
        self.success || self.status.as_deref() == Some("success")
    }
}

/// One stored copy of a day's plan from the backup endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackupEntry {
    pub date: NaiveDate,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub priorities: Vec<PriorityRecord>,
    #[serde(default)]
    pub time_blocks: Vec<TimeBlockRecord>,
    #[serde(default)]
    pub brain_dump: Option<String>,
    #[serde(default)]
    pub productivity_rating: Option<u8>,
}

impl BackupEntry {
    /// Number of time blocks with a task assigned.
    pub fn assigned_block_count(&self) -> usize {
        self.time_blocks.iter().filter(|b| b.task_id.is_some()).count()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `HH:MM` times, the format the backend parses. `HH:MM:SS` is accepted on input.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

/// Server timestamps arrive either as RFC 3339 or as naive ISO strings in UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_block_serializes_hhmm() {
        let block = TimeBlockRecord {
            start_time: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            task_id: Some(TaskId::from(42)),
            notes: String::new(),
            completed: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["start_time"], "09:15");
        assert_eq!(json["end_time"], "09:30");
        assert_eq!(json["task_id"], "42");
    }

    #[test]
    fn test_backup_entry_accepts_backend_shapes() {
        let json = r#"{
            "date": "2024-03-01",
            "updated_at": "2024-03-01T10:30:00.123456",
            "priorities": [{"content": "Write report", "completed": true, "order": 0}],
            "time_blocks": [
                {"start_time": "09:00:00", "end_time": "09:15:00", "task_id": 7, "notes": null},
                {"start_time": "09:15", "end_time": "09:30", "task_id": null}
            ],
            "brain_dump": null,
            "productivity_rating": 4
        }"#;
        let entry: BackupEntry = serde_json::from_str(json).unwrap();
        assert_eq!(
            entry.updated_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap() + chrono::Duration::microseconds(123456)
        );
        assert_eq!(entry.time_blocks[0].task_id, Some(TaskId::new("7")));
        assert_eq!(entry.time_blocks[0].notes, "");
        assert_eq!(entry.assigned_block_count(), 1);
        assert_eq!(entry.productivity_rating, Some(4));
        assert!(entry.brain_dump.is_none());
    }

    #[test]
    fn test_timestamp_rfc3339_with_offset() {
        let parsed = timestamp::parse("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_save_response_variants() {
        let ok: SaveResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.is_success());

        let legacy: SaveResponse = serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(legacy.is_success());

        let conflict: SaveResponse =
            serde_json::from_str(r#"{"success": false, "conflict": true}"#).unwrap();
        assert!(!conflict.is_success());
        assert!(conflict.conflict);

        let failed: SaveResponse =
            serde_json::from_str(r#"{"success": false, "error": "db locked"}"#).unwrap();
        assert!(!failed.conflict);
        assert_eq!(failed.error.as_deref(), Some("db locked"));
    }
}
