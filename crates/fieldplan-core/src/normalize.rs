//! Boundary between the persistence collaborator's loose record shapes and
//! the canonical [`Task`] model.
//!
//! The upstream dashboard API has grown several alternate field spellings
//! (`status` string vs a legacy `completed` boolean, optional `timeline`
//! block). All of that ambiguity is resolved here, once; a malformed record
//! degrades in place and is never allowed to abort the batch.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::datetime::{parse_due_date, parse_due_time};
use crate::task::{Priority, Status, Task, TaskType};

/// Task record as returned by `fetchTasksForScope`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTaskRecord {
    pub id: String,
    pub title: String,
    pub status: Option<String>,
    /// Legacy boolean shape still emitted by older backend rows; consulted
    /// only when `status` is missing or unrecognized.
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub assignee: Option<String>,
    pub note: Option<String>,
    pub scope: Option<String>,
    pub timeline: Option<RawTimeline>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTimeline {
    pub due_date: Option<String>,
    pub due_time: Option<String>,
}

/// One pre-aggregated day from `fetchCalendarData`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDayBucket {
    pub day: u32,
    pub tasks: Vec<RawTaskRecord>,
}

/// Convert one raw record into a canonical task. Total: every degradation
/// (unknown enum value, unparseable date) falls back to a documented
/// default and is logged, so one bad record never costs the batch.
#[tracing::instrument(skip(raw), fields(id = %raw.id))]
pub fn normalize(raw: &RawTaskRecord) -> Task {
    let id = if raw.id.trim().is_empty() {
        let generated = Uuid::new_v4().to_string();
        warn!(generated = %generated, "record has no id; generating one");
        generated
    } else {
        raw.id.trim().to_string()
    };

    let title = if raw.title.trim().is_empty() {
        warn!("record has no title");
        "(untitled)".to_string()
    } else {
        raw.title.trim().to_string()
    };

    let task_type = match raw.task_type.as_deref() {
        None => TaskType::General,
        Some(value) => TaskType::parse(value).unwrap_or_else(|| {
            warn!(task_type = %value, "unknown task type; defaulting to general");
            TaskType::General
        }),
    };

    let status = resolve_status(raw);

    let priority = match raw.priority.as_deref() {
        None => Priority::Low,
        Some(value) => Priority::parse(value).unwrap_or_else(|| {
            warn!(priority = %value, "unknown priority; defaulting to low");
            Priority::Low
        }),
    };

    let due_date = raw
        .timeline
        .as_ref()
        .and_then(|t| t.due_date.as_deref())
        .and_then(|value| {
            let parsed = parse_due_date(value);
            if parsed.is_none() {
                warn!(due_date = %value, "unparseable due date; task keeps no date");
            }
            parsed
        });

    let due_time = raw
        .timeline
        .as_ref()
        .and_then(|t| t.due_time.as_deref())
        .and_then(|value| {
            let parsed = parse_due_time(value);
            if parsed.is_none() {
                debug!(due_time = %value, "unparseable due time; dropped");
            }
            parsed
        });

    Task {
        id,
        title,
        task_type,
        status,
        priority,
        assignee: raw.assignee.clone().unwrap_or_default(),
        due_date,
        due_time,
        note: raw.note.clone(),
    }
}

/// Normalize a whole fetch result. Never fails and never drops a record;
/// tasks without a parseable date simply stay off the calendar views.
#[tracing::instrument(skip(raw_records), fields(count = raw_records.len()))]
pub fn normalize_all(raw_records: &[RawTaskRecord]) -> Vec<Task> {
    raw_records.iter().map(normalize).collect()
}

fn resolve_status(raw: &RawTaskRecord) -> Status {
    if let Some(value) = raw.status.as_deref() {
        if let Some(status) = Status::parse(value) {
            return status;
        }
        warn!(status = %value, "unknown status value");
    }

    match raw.completed {
        Some(true) => Status::Completed,
        Some(false) => Status::Pending,
        None => Status::Pending,
    }
}
