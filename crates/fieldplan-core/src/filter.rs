//! Temporal bucketing and search for the planner views.
//!
//! Classification treats a due date as the whole civil day; "now" only
//! contributes its date component. A task without a due date can never
//! match a date bucket but still participates in All/Completed/type/search.

use chrono::{Days, NaiveDateTime};
use tracing::trace;

use crate::task::{Task, TaskType};

/// Forward window, in days, for the "this week" bucket (inclusive).
const WEEK_WINDOW_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSelector {
    All,
    Today,
    ThisWeek,
    Overdue,
    Completed,
    Type(TaskType),
}

impl FilterSelector {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "today" => Some(Self::Today),
            "week" | "thisweek" | "this-week" => Some(Self::ThisWeek),
            "overdue" => Some(Self::Overdue),
            "completed" => Some(Self::Completed),
            other => TaskType::parse(other).map(Self::Type),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::ThisWeek => "this week",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Type(task_type) => task_type.as_str(),
        }
    }
}

/// Apply a selector and a free-text query to a task snapshot.
///
/// Returns borrowed tasks in input order; filtering never reorders and
/// never touches the snapshot.
#[tracing::instrument(skip(tasks, now), fields(count = tasks.len(), query = query))]
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    selector: FilterSelector,
    query: &str,
    now: NaiveDateTime,
) -> Vec<&'a Task> {
    let needle = query.trim().to_lowercase();
    tasks
        .iter()
        .filter(|task| matches_selector(task, selector, now))
        .filter(|task| matches_query(task, &needle))
        .collect()
}

pub fn matches_selector(task: &Task, selector: FilterSelector, now: NaiveDateTime) -> bool {
    let today = now.date();
    let ok = match selector {
        FilterSelector::All => true,
        FilterSelector::Completed => task.is_completed(),
        FilterSelector::Type(task_type) => task.task_type == task_type,
        FilterSelector::Today => task.due_date.is_some_and(|due| due == today),
        FilterSelector::ThisWeek => task.due_date.is_some_and(|due| {
            let horizon = today
                .checked_add_days(Days::new(WEEK_WINDOW_DAYS))
                .unwrap_or(today);
            due >= today && due <= horizon
        }),
        FilterSelector::Overdue => {
            !task.is_completed() && task.due_date.is_some_and(|due| due < today)
        }
    };

    trace!(id = %task.id, selector = selector.label(), ok, "selector evaluation");
    ok
}

fn matches_query(task: &Task, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    task.title.to_lowercase().contains(needle) || task.assignee.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{FilterSelector, filter_tasks, matches_selector};
    use crate::task::{Priority, Status, Task, TaskType};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .expect("valid date")
            .and_hms_opt(9, 30, 0)
            .expect("valid time")
    }

    fn task(id: &str, due: Option<&str>, status: Status) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            task_type: TaskType::General,
            status,
            priority: Priority::Low,
            assignee: String::new(),
            due_date: due.and_then(crate::datetime::parse_due_date),
            due_time: None,
            note: None,
        }
    }

    #[test]
    fn overdue_and_this_week_are_exclusive_around_now() {
        let yesterday = task("late", Some("2025-03-09"), Status::Pending);
        let upcoming = task("soon", Some("2025-03-15"), Status::Pending);

        assert!(matches_selector(&yesterday, FilterSelector::Overdue, now()));
        assert!(!matches_selector(&yesterday, FilterSelector::ThisWeek, now()));

        assert!(matches_selector(&upcoming, FilterSelector::ThisWeek, now()));
        assert!(!matches_selector(&upcoming, FilterSelector::Overdue, now()));
    }

    #[test]
    fn week_window_is_inclusive_on_both_ends() {
        let today = task("a", Some("2025-03-10"), Status::Pending);
        let boundary = task("b", Some("2025-03-17"), Status::Pending);
        let past_boundary = task("c", Some("2025-03-18"), Status::Pending);

        assert!(matches_selector(&today, FilterSelector::ThisWeek, now()));
        assert!(matches_selector(&boundary, FilterSelector::ThisWeek, now()));
        assert!(!matches_selector(&past_boundary, FilterSelector::ThisWeek, now()));
    }

    #[test]
    fn completed_tasks_are_never_overdue() {
        let done = task("done", Some("2025-03-09"), Status::Completed);
        assert!(!matches_selector(&done, FilterSelector::Overdue, now()));
        assert!(matches_selector(&done, FilterSelector::Completed, now()));
    }

    #[test]
    fn dateless_tasks_skip_date_buckets_but_keep_the_rest() {
        let dateless = task("floating", None, Status::Completed);

        assert!(matches_selector(&dateless, FilterSelector::All, now()));
        assert!(matches_selector(&dateless, FilterSelector::Completed, now()));
        assert!(matches_selector(
            &dateless,
            FilterSelector::Type(TaskType::General),
            now()
        ));
        assert!(!matches_selector(&dateless, FilterSelector::Today, now()));
        assert!(!matches_selector(&dateless, FilterSelector::ThisWeek, now()));
        assert!(!matches_selector(&dateless, FilterSelector::Overdue, now()));
    }

    #[test]
    fn query_matches_title_and_assignee_case_insensitively() {
        let mut irrigation = task("t1", None, Status::Pending);
        irrigation.title = "Check irrigation lines".to_string();
        let mut fencing = task("t2", None, Status::Pending);
        fencing.assignee = "Dana".to_string();
        let tasks = vec![irrigation, fencing];

        let hits = filter_tasks(&tasks, FilterSelector::All, "IRRIG", now());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t1");

        let hits = filter_tasks(&tasks, FilterSelector::All, "dana", now());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "t2");

        assert_eq!(filter_tasks(&tasks, FilterSelector::All, "  ", now()).len(), 2);
    }

    #[test]
    fn result_preserves_input_order() {
        let tasks = vec![
            task("z", Some("2025-03-11"), Status::Pending),
            task("a", Some("2025-03-12"), Status::Pending),
            task("m", Some("2025-03-13"), Status::Pending),
        ];
        let ids: Vec<&str> = filter_tasks(&tasks, FilterSelector::ThisWeek, "", now())
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["z", "a", "m"]);
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(FilterSelector::parse("Week"), Some(FilterSelector::ThisWeek));
        assert_eq!(
            FilterSelector::parse("crop"),
            Some(FilterSelector::Type(TaskType::Crop))
        );
        assert_eq!(FilterSelector::parse("someday"), None);
    }
}
