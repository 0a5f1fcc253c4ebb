pub mod form;
pub mod types;

pub use form::{BlockState, FormState, Priority};
pub use types::{
    BackupEntry, PlanSnapshot, PriorityRecord, SaveResponse, TaskId, TimeBlockRecord,
};
