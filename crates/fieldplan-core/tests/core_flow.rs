use chrono::NaiveDate;
use fieldplan_core::controller::{
    CalendarController, CalendarSource, FetchOutcome, PlannerController, TaskSource,
};
use fieldplan_core::datastore::DataStore;
use fieldplan_core::filter::FilterSelector;
use fieldplan_core::normalize::{RawTaskRecord, RawTimeline};
use tempfile::tempdir;

fn record(id: &str, title: &str, due: Option<&str>) -> RawTaskRecord {
    RawTaskRecord {
        id: id.to_string(),
        title: title.to_string(),
        task_type: Some("crop".to_string()),
        timeline: due.map(|d| RawTimeline {
            due_date: Some(d.to_string()),
            due_time: None,
        }),
        ..RawTaskRecord::default()
    }
}

#[test]
fn store_to_calendar_grid_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    store
        .add_record(record("sow-1", "Sow barley", Some("2025-04-10")))
        .expect("add");
    store
        .add_record(record("sow-2", "Sow oats", Some("2025-04-10")))
        .expect("add");
    store
        .add_record(record("float", "Order seed", None))
        .expect("add");

    let mut ctl = CalendarController::new(2025, 4).expect("controller");
    let ticket = ctl.sync();
    let outcome = ctl.resolve_days(ticket, store.fetch_calendar_days(2025, 4));
    assert_eq!(outcome, FetchOutcome::Applied);

    let today = NaiveDate::from_ymd_opt(2025, 4, 1).expect("date");
    let grid = ctl.grid(Some(today)).expect("grid");
    assert_eq!(grid.cells.len(), 42);

    let cell = grid.cell_for_day(10).expect("april 10 cell");
    let ids: Vec<&str> = cell.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["sow-1", "sow-2"]);

    // The dateless task never lands on a cell.
    let bound: usize = grid.cells.iter().map(|c| c.tasks.len()).sum();
    assert_eq!(bound, 2);
}

#[test]
fn crud_then_refresh_updates_the_planner_view() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    store
        .add_record(record("fence", "Repair fence", Some("2025-03-08")))
        .expect("add");
    store
        .add_record(record("weigh", "Weigh lambs", Some("2025-03-12")))
        .expect("add");

    let now = NaiveDate::from_ymd_opt(2025, 3, 10)
        .expect("date")
        .and_hms_opt(7, 0, 0)
        .expect("time");

    let mut planner = PlannerController::new("default");
    let ticket = planner.sync();
    planner.resolve(ticket, store.fetch_tasks("default"));

    planner.set_selector(FilterSelector::Overdue);
    let overdue: Vec<&str> = planner.visible(now).iter().map(|t| t.id.as_str()).collect();
    assert_eq!(overdue, ["fence"]);

    // Completing the task and refreshing removes it from the bucket.
    store
        .update_record("fence", |r| {
            r.status = Some("completed".to_string());
        })
        .expect("update");

    let ticket = planner.sync();
    planner.resolve(ticket, store.fetch_tasks("default"));
    assert!(planner.visible(now).is_empty());

    planner.set_selector(FilterSelector::Completed);
    let completed: Vec<&str> = planner.visible(now).iter().map(|t| t.id.as_str()).collect();
    assert_eq!(completed, ["fence"]);
}

#[test]
fn navigation_discards_the_superseded_months_response() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");

    store
        .add_record(record("mar", "Prune apples", Some("2025-03-05")))
        .expect("add");
    store
        .add_record(record("apr", "Graft pears", Some("2025-04-05")))
        .expect("add");

    let mut ctl = CalendarController::new(2025, 3).expect("controller");

    // Fetch for March goes out, the user navigates to April before it
    // resolves, and the March response arrives last.
    let march_ticket = ctl.sync();
    let march_result = store.fetch_calendar_days(2025, 3);

    let april_ticket = ctl.navigate(1);
    let april_result = store.fetch_calendar_days(2025, 4);

    assert_eq!(ctl.resolve_days(april_ticket, april_result), FetchOutcome::Applied);
    assert_eq!(ctl.resolve_days(march_ticket, march_result), FetchOutcome::Stale);

    let grid = ctl.grid(None).expect("grid");
    assert_eq!((grid.year, grid.month), (2025, 4));
    assert_eq!(grid.cell_for_day(5).expect("cell").tasks[0].id, "apr");
}
