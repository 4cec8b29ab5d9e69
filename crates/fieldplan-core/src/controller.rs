//! View controllers for the calendar and planner surfaces.
//!
//! Controllers own the canonical task snapshot and the refresh lifecycle
//! around an injected persistence collaborator. Every fetch is tagged with
//! a monotonically increasing token; only the most recently issued token
//! may apply its result, so a slow response for a month the user already
//! left can never clobber the current view (last navigation wins). A
//! failed fetch keeps the previous snapshot in place: the user sees a
//! retryable error, never a blank screen.
//!
//! All methods are synchronous. The host event loop performs the actual
//! I/O between `sync()`/`navigate()` and `resolve_*`.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::calendar::{DayTasks, MonthGrid, advance, build_month_grid, build_month_grid_from_days};
use crate::filter::{FilterSelector, filter_tasks};
use crate::normalize::{RawDayBucket, RawTaskRecord, normalize_all};
use crate::task::Task;

/// Persistence read for the planner views (`fetchTasksForScope`).
pub trait TaskSource {
    fn fetch_tasks(&self, scope: &str) -> anyhow::Result<Vec<RawTaskRecord>>;
}

/// Alternate persistence read for the calendar view, pre-aggregated by day
/// (`fetchCalendarData`).
pub trait CalendarSource {
    fn fetch_calendar_days(&self, year: i32, month: u32) -> anyhow::Result<Vec<RawDayBucket>>;
}

/// Handle for one issued fetch. Resolving with a superseded ticket is a
/// no-op by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Result applied; snapshot replaced wholesale.
    Applied,
    /// Ticket was superseded before the result arrived; discarded silently.
    Stale,
    /// Collaborator failed; previous snapshot retained, error recorded.
    Failed,
}

#[derive(Debug, Clone)]
enum Snapshot {
    Flat(Vec<Task>),
    Days(Vec<DayTasks>),
}

/// Controller behind the month calendar view and its per-day task modal.
#[derive(Debug)]
pub struct CalendarController {
    year: i32,
    month: u32,
    snapshot: Snapshot,
    last_issued: u64,
    error: Option<String>,
}

impl CalendarController {
    pub fn new(year: i32, month: u32) -> anyhow::Result<Self> {
        if !(1..=12).contains(&month) {
            anyhow::bail!("month out of range 1-12: {month}");
        }
        Ok(Self {
            year,
            month,
            snapshot: Snapshot::Flat(vec![]),
            last_issued: 0,
            error: None,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Last fetch error, if the snapshot on screen is older than the most
    /// recent attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Move the focal month and issue a fresh fetch ticket, superseding
    /// any fetch still in flight.
    #[tracing::instrument(skip(self))]
    pub fn navigate(&mut self, delta: i32) -> FetchTicket {
        let (year, month) = advance(self.year, self.month, delta);
        info!(from_year = self.year, from_month = self.month, year, month, "calendar navigation");
        self.year = year;
        self.month = month;
        self.issue()
    }

    /// Explicit refresh of the current focal month.
    #[tracing::instrument(skip(self))]
    pub fn sync(&mut self) -> FetchTicket {
        self.issue()
    }

    /// Apply a `fetchTasksForScope` result: normalize the flat list and
    /// replace the snapshot.
    #[tracing::instrument(skip(self, result))]
    pub fn resolve_tasks(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<RawTaskRecord>>,
    ) -> FetchOutcome {
        self.resolve_with(ticket, result, |records| {
            Snapshot::Flat(normalize_all(&records))
        })
    }

    /// Apply a `fetchCalendarData` result: the backend pre-aggregated by
    /// day, so only the per-cell binding consumes the buckets.
    #[tracing::instrument(skip(self, result))]
    pub fn resolve_days(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<RawDayBucket>>,
    ) -> FetchOutcome {
        self.resolve_with(ticket, result, |buckets| {
            Snapshot::Days(
                buckets
                    .iter()
                    .map(|bucket| DayTasks {
                        day: bucket.day,
                        tasks: normalize_all(&bucket.tasks),
                    })
                    .collect(),
            )
        })
    }

    /// The derived month grid. Pure recomputation from the current
    /// snapshot; no independent identity, no caching.
    pub fn grid(&self, today: Option<NaiveDate>) -> anyhow::Result<MonthGrid<'_>> {
        match &self.snapshot {
            Snapshot::Flat(tasks) => build_month_grid(self.year, self.month, tasks, today),
            Snapshot::Days(days) => build_month_grid_from_days(self.year, self.month, days, today),
        }
    }

    fn issue(&mut self) -> FetchTicket {
        self.last_issued += 1;
        debug!(token = self.last_issued, "issued fetch ticket");
        FetchTicket {
            token: self.last_issued,
        }
    }

    fn resolve_with<T>(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<T>,
        into_snapshot: impl FnOnce(T) -> Snapshot,
    ) -> FetchOutcome {
        if ticket.token != self.last_issued {
            debug!(token = ticket.token, current = self.last_issued, "discarding stale fetch result");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(payload) => {
                self.snapshot = into_snapshot(payload);
                self.error = None;
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "fetch failed; keeping previous snapshot");
                self.error = Some(format!("{err:#}"));
                FetchOutcome::Failed
            }
        }
    }
}

/// Controller behind the task planner list.
#[derive(Debug)]
pub struct PlannerController {
    scope: String,
    tasks: Vec<Task>,
    selector: FilterSelector,
    query: String,
    last_issued: u64,
    error: Option<String>,
}

impl PlannerController {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            tasks: vec![],
            selector: FilterSelector::All,
            query: String::new(),
            last_issued: 0,
            error: None,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn selector(&self) -> FilterSelector {
        self.selector
    }

    pub fn set_selector(&mut self, selector: FilterSelector) {
        self.selector = selector;
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The full canonical snapshot ("All" counts include dateless tasks).
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Explicit refresh of the current scope.
    #[tracing::instrument(skip(self))]
    pub fn sync(&mut self) -> FetchTicket {
        self.issue()
    }

    /// Scope switch as an explicit cancel-then-refetch transition: the new
    /// ticket supersedes anything in flight for the old scope, and the old
    /// list stays on screen until the new result lands.
    #[tracing::instrument(skip(self))]
    pub fn on_scope_changed(&mut self, scope: &str) -> FetchTicket {
        info!(from = %self.scope, to = scope, "planner scope change");
        self.scope = scope.to_string();
        self.issue()
    }

    #[tracing::instrument(skip(self, result))]
    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<RawTaskRecord>>,
    ) -> FetchOutcome {
        if ticket.token != self.last_issued {
            debug!(token = ticket.token, current = self.last_issued, "discarding stale fetch result");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(records) => {
                self.tasks = normalize_all(&records);
                self.error = None;
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "fetch failed; keeping previous list");
                self.error = Some(format!("{err:#}"));
                FetchOutcome::Failed
            }
        }
    }

    /// The filtered, search-narrowed view in stable input order.
    pub fn visible(&self, now: NaiveDateTime) -> Vec<&Task> {
        filter_tasks(&self.tasks, self.selector, &self.query, now)
    }

    fn issue(&mut self) -> FetchTicket {
        self.last_issued += 1;
        debug!(token = self.last_issued, "issued fetch ticket");
        FetchTicket {
            token: self.last_issued,
        }
    }
}
