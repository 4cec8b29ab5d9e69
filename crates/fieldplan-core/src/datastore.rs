//! JSONL-backed task store used by the CLI driver.
//!
//! This is the local stand-in for the dashboard's persistence collaborator:
//! it implements [`TaskSource`] and [`CalendarSource`] and is injected into
//! the controllers. Lifecycle is explicit: opened once per invocation,
//! every write goes through an atomic save, and a successful write is
//! always followed by a controller refresh rather than an in-place patch.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Datelike;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::controller::{CalendarSource, TaskSource};
use crate::datetime::parse_due_date;
use crate::normalize::{RawDayBucket, RawTaskRecord};

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_records(&self) -> anyhow::Result<Vec<RawTaskRecord>> {
        debug!(file = %self.tasks_path.display(), "loading jsonl");
        let file = fs::File::open(&self.tasks_path)
            .with_context(|| format!("failed opening {}", self.tasks_path.display()))?;
        let reader = BufReader::new(file);

        let mut out = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record: RawTaskRecord = serde_json::from_str(trimmed).with_context(|| {
                format!("failed parsing {} line {}", self.tasks_path.display(), idx + 1)
            })?;
            out.push(record);
        }

        debug!(count = out.len(), "loaded task records");
        Ok(out)
    }

    #[tracing::instrument(skip(self, records))]
    pub fn save_records(&self, records: &[RawTaskRecord]) -> anyhow::Result<()> {
        debug!(file = %self.tasks_path.display(), count = records.len(), "saving jsonl atomically");

        let dir = self.tasks_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        for record in records {
            let serialized = serde_json::to_string(record)?;
            writeln!(temp, "{serialized}")?;
        }
        temp.flush()?;

        temp.persist(&self.tasks_path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.tasks_path.display(), err))?;

        Ok(())
    }

    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub fn add_record(&self, record: RawTaskRecord) -> anyhow::Result<()> {
        let mut records = self.load_records()?;
        records.push(record);
        self.save_records(&records)
    }

    #[tracing::instrument(skip(self, apply))]
    pub fn update_record(
        &self,
        id: &str,
        apply: impl FnOnce(&mut RawTaskRecord),
    ) -> anyhow::Result<()> {
        let mut records = self.load_records()?;
        let record = find_by_id(&mut records, id)?;
        apply(record);
        self.save_records(&records)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_record(&self, id: &str) -> anyhow::Result<()> {
        let mut records = self.load_records()?;
        let before = records.len();
        let matched = resolve_id(&records, id)?;
        records.retain(|record| record.id != matched);
        debug!(before, after = records.len(), "deleted task record");
        self.save_records(&records)
    }
}

impl TaskSource for DataStore {
    #[tracing::instrument(skip(self))]
    fn fetch_tasks(&self, scope: &str) -> anyhow::Result<Vec<RawTaskRecord>> {
        let records = self.load_records()?;
        Ok(records
            .into_iter()
            .filter(|record| match record.scope.as_deref() {
                None => true,
                Some(record_scope) => record_scope == scope,
            })
            .collect())
    }
}

impl CalendarSource for DataStore {
    /// Pre-aggregate by day, as the dashboard backend's calendar endpoint
    /// does. Records without a parseable due date are left out here; they
    /// can never land on a day cell anyway.
    #[tracing::instrument(skip(self))]
    fn fetch_calendar_days(&self, year: i32, month: u32) -> anyhow::Result<Vec<RawDayBucket>> {
        let records = self.load_records()?;
        let mut buckets: Vec<RawDayBucket> = Vec::new();

        for record in records {
            let Some(due) = record
                .timeline
                .as_ref()
                .and_then(|t| t.due_date.as_deref())
                .and_then(parse_due_date)
            else {
                continue;
            };
            if due.year() != year || due.month() != month {
                continue;
            }

            match buckets.iter_mut().find(|bucket| bucket.day == due.day()) {
                Some(bucket) => bucket.tasks.push(record),
                None => buckets.push(RawDayBucket {
                    day: due.day(),
                    tasks: vec![record],
                }),
            }
        }

        buckets.sort_by_key(|bucket| bucket.day);
        Ok(buckets)
    }
}

fn find_by_id<'a>(
    records: &'a mut [RawTaskRecord],
    id: &str,
) -> anyhow::Result<&'a mut RawTaskRecord> {
    let matched = resolve_id(records, id)?;
    records
        .iter_mut()
        .find(|record| record.id == matched)
        .ok_or_else(|| anyhow!("task not found: {id}"))
}

/// Resolve an id or unambiguous id prefix to the full stored id.
fn resolve_id(records: &[RawTaskRecord], id: &str) -> anyhow::Result<String> {
    if records.iter().any(|record| record.id == id) {
        return Ok(id.to_string());
    }

    let mut matches = records.iter().filter(|record| record.id.starts_with(id));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("task not found: {id}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("ambiguous task id prefix: {id}"));
    }
    Ok(first.id.clone())
}
