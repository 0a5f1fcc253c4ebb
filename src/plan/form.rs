use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use super::types::{
    BackupEntry, PlanSnapshot, PriorityRecord, TaskId, TimeBlockRecord, BLOCK_MINUTES,
};
use crate::error::AutosaveError;

/// Highest value of the productivity rating scale.
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Priority {
    pub text: String,
    pub done: bool,
}

/// Editable fields of one time slot. The slot's start time is its key in
/// [`FormState`] and its end time is always derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockState {
    pub task: Option<TaskId>,
    pub note: String,
    pub done: bool,
}

/// In-memory copy of the daily plan being edited.
///
/// Change listeners write here; the autosave only ever reads from here.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    date: NaiveDate,
    priorities: Vec<Priority>,
    blocks: BTreeMap<NaiveTime, BlockState>,
    brain_dump: String,
    rating: Option<u8>,
}

impl FormState {
    /// An empty plan with no time slots.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            priorities: Vec::new(),
            blocks: BTreeMap::new(),
            brain_dump: String::new(),
            rating: None,
        }
    }

    /// A plan with empty 15-minute slots from `first` up to (not including) `end`.
    pub fn with_day_grid(date: NaiveDate, first: NaiveTime, end: NaiveTime) -> Self {
        let mut form = Self::new(date);
        let mut start = first;
        while start < end {
            form.blocks.insert(start, BlockState::default());
            let next = start + Duration::minutes(BLOCK_MINUTES);
            if next <= start {
                break;
            }
            start = next;
        }
        form
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn priorities(&self) -> &[Priority] {
        &self.priorities
    }

    pub fn add_priority(&mut self, text: impl Into<String>) {
        self.priorities.push(Priority {
            text: text.into(),
            done: false,
        });
    }

    pub fn set_priority_text(&mut self, index: usize, text: impl Into<String>) -> bool {
        match self.priorities.get_mut(index) {
            Some(p) => {
                p.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn toggle_priority(&mut self, index: usize) -> bool {
        match self.priorities.get_mut(index) {
            Some(p) => {
                p.done = !p.done;
                true
            }
            None => false,
        }
    }

    pub fn remove_priority(&mut self, index: usize) -> Option<Priority> {
        (index < self.priorities.len()).then(|| self.priorities.remove(index))
    }

    /// Number of priorities that would be submitted (blank ones are skipped).
    pub fn priority_count(&self) -> usize {
        self.priorities.iter().filter(|p| !p.text.trim().is_empty()).count()
    }

    pub fn block(&self, start: NaiveTime) -> Option<&BlockState> {
        self.blocks.get(&start)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn assigned_block_count(&self) -> usize {
        self.blocks.values().filter(|b| b.task.is_some()).count()
    }

    fn block_mut(&mut self, start: NaiveTime) -> &mut BlockState {
        self.blocks.entry(start).or_default()
    }

    pub fn assign_task(&mut self, start: NaiveTime, task: Option<TaskId>) {
        self.block_mut(start).task = task;
    }

    pub fn set_block_note(&mut self, start: NaiveTime, note: impl Into<String>) {
        self.block_mut(start).note = note.into();
    }

    pub fn set_block_done(&mut self, start: NaiveTime, done: bool) {
        self.block_mut(start).done = done;
    }

    pub fn brain_dump(&self) -> &str {
        &self.brain_dump
    }

    pub fn set_brain_dump(&mut self, text: impl Into<String>) {
        self.brain_dump = text.into();
    }

    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    pub fn set_rating(&mut self, rating: Option<u8>) {
        self.rating = rating;
    }

    /// Checks that run before any network call.
    pub fn validate(&self) -> Result<(), AutosaveError> {
        if let Some(rating) = self.rating {
            if !(1..=MAX_RATING).contains(&rating) {
                return Err(AutosaveError::Validation(format!(
                    "Productivity rating must be between 1 and {}, got {}",
                    MAX_RATING, rating
                )));
            }
        }
        Ok(())
    }

    /// Serialize the current state into the payload of one save attempt.
    pub fn snapshot(&self, last_observed: DateTime<Utc>) -> Result<PlanSnapshot, AutosaveError> {
        self.validate()?;

        let priorities = self
            .priorities
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .enumerate()
            .map(|(order, p)| PriorityRecord {
                content: p.text.clone(),
                completed: p.done,
                order,
            })
            .collect();

        let time_blocks = self
            .blocks
            .iter()
            .map(|(start, block)| TimeBlockRecord {
                start_time: *start,
                end_time: *start + Duration::minutes(BLOCK_MINUTES),
                task_id: block.task.clone(),
                notes: block.note.clone(),
                completed: block.done,
            })
            .collect();

        Ok(PlanSnapshot {
            date: self.date,
            priorities,
            time_blocks,
            brain_dump: self.brain_dump.clone(),
            productivity_rating: self.rating,
            last_update_check: last_observed,
            auto_save: true,
        })
    }

    /// Overwrite every editable field with the contents of a backup.
    ///
    /// Slots the backup does not mention are cleared; the plan's date is kept.
    pub fn apply_backup(&mut self, backup: &BackupEntry) {
        let mut ordered: Vec<&PriorityRecord> = backup.priorities.iter().collect();
        ordered.sort_by_key(|p| p.order);
        self.priorities = ordered
            .into_iter()
            .map(|p| Priority {
                text: p.content.clone(),
                done: p.completed,
            })
            .collect();

        for block in self.blocks.values_mut() {
            *block = BlockState::default();
        }
        for record in &backup.time_blocks {
            *self.block_mut(record.start_time) = BlockState {
                task: record.task_id.clone(),
                note: record.notes.clone(),
                done: record.completed,
            };
        }

        self.brain_dump = backup.brain_dump.clone().unwrap_or_default();
        self.rating = backup.productivity_rating.filter(|r| *r > 0);
    }
}
