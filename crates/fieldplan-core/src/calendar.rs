//! Month-grid construction for the calendar views.
//!
//! A grid is a pure derived value: recomputed wholesale from
//! `(year, month, tasks)` on every refresh, never patched in place. Cells
//! borrow the caller's task slice; nothing here copies or mutates a task.

use anyhow::{anyhow, bail};
use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::datetime::{days_in_month, first_weekday_of_month};
use crate::task::Task;

/// 6 rows x 7 columns, regardless of month shape. Keeps the layout stable
/// for every month/weekday combination.
pub const GRID_CELLS: usize = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    /// Day-of-month number within the cell's own month.
    pub day: u32,
    /// -1 previous month, 0 focal month, +1 next month.
    pub month_offset: i8,
    pub is_today: bool,
    /// Tasks due on this absolute date, in input order. Always empty for
    /// overflow cells; a task is rendered only under its true month.
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid<'a> {
    pub year: i32,
    /// Focal month, 1-12.
    pub month: u32,
    /// Always exactly [`GRID_CELLS`]; cell 0 is a Sunday, cell 41 a Saturday.
    pub cells: Vec<DayCell<'a>>,
}

impl<'a> MonthGrid<'a> {
    /// Cell for a day of the focal month (the per-day task modal's view).
    pub fn cell_for_day(&self, day: u32) -> Option<&DayCell<'a>> {
        self.cells
            .iter()
            .find(|cell| cell.month_offset == 0 && cell.day == day)
    }
}

/// Normalized form of one `fetchCalendarData` day bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayTasks {
    pub day: u32,
    pub tasks: Vec<Task>,
}

/// Month arithmetic with year rollover. Total for any delta; twelve steps
/// in one direction return to the starting pair.
pub fn advance(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) + delta;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// Build the 42-cell grid for a focal month and bind each task with a
/// matching due date to its focal cell.
///
/// A month outside 1-12 is a caller contract violation and is rejected
/// immediately, never clamped. Nothing else can fail for in-range years.
#[tracing::instrument(skip(tasks, today), fields(count = tasks.len()))]
pub fn build_month_grid<'a>(
    year: i32,
    month: u32,
    tasks: &'a [Task],
    today: Option<NaiveDate>,
) -> anyhow::Result<MonthGrid<'a>> {
    let mut cells = skeleton(year, month, today)?;

    for cell in cells.iter_mut().filter(|cell| cell.month_offset == 0) {
        let date = NaiveDate::from_ymd_opt(year, month, cell.day)
            .ok_or_else(|| anyhow!("unrepresentable date: {year}-{month:02}-{:02}", cell.day))?;
        cell.tasks = tasks.iter().filter(|task| task.due_on(date)).collect();
    }

    Ok(MonthGrid { year, month, cells })
}

/// Grid construction for the pre-aggregated collaborator entry point
/// (`fetchCalendarData`): the skeleton is built exactly as in
/// [`build_month_grid`], only the task binding consumes the buckets.
#[tracing::instrument(skip(days, today), fields(buckets = days.len()))]
pub fn build_month_grid_from_days<'a>(
    year: i32,
    month: u32,
    days: &'a [DayTasks],
    today: Option<NaiveDate>,
) -> anyhow::Result<MonthGrid<'a>> {
    let mut cells = skeleton(year, month, today)?;
    let first_weekday = first_weekday_of_month(year, month)
        .ok_or_else(|| anyhow!("calendar date out of range: {year}-{month:02}"))? as usize;
    let month_len = days_in_month(year, month);

    for bucket in days {
        if bucket.day < 1 || bucket.day > month_len {
            warn!(day = bucket.day, year, month, "day bucket outside focal month; ignored");
            continue;
        }
        let idx = first_weekday + bucket.day as usize - 1;
        cells[idx].tasks.extend(bucket.tasks.iter());
    }

    Ok(MonthGrid { year, month, cells })
}

fn skeleton<'a>(
    year: i32,
    month: u32,
    today: Option<NaiveDate>,
) -> anyhow::Result<Vec<DayCell<'a>>> {
    if !(1..=12).contains(&month) {
        bail!("month out of range 1-12: {month}");
    }
    let first_weekday = first_weekday_of_month(year, month)
        .ok_or_else(|| anyhow!("calendar date out of range: {year}-{month:02}"))?;

    let month_len = days_in_month(year, month);
    let (prev_year, prev_month) = advance(year, month, -1);
    let (next_year, next_month) = advance(year, month, 1);
    let prev_len = days_in_month(prev_year, prev_month);

    let is_today = |y: i32, m: u32, d: u32| {
        today.is_some_and(|t| t.year() == y && t.month() == m && t.day() == d)
    };

    let mut cells = Vec::with_capacity(GRID_CELLS);

    for i in 0..first_weekday {
        let day = prev_len - first_weekday + 1 + i;
        cells.push(DayCell {
            day,
            month_offset: -1,
            is_today: is_today(prev_year, prev_month, day),
            tasks: vec![],
        });
    }

    for day in 1..=month_len {
        cells.push(DayCell {
            day,
            month_offset: 0,
            is_today: is_today(year, month, day),
            tasks: vec![],
        });
    }

    let mut day = 1;
    while cells.len() < GRID_CELLS {
        cells.push(DayCell {
            day,
            month_offset: 1,
            is_today: is_today(next_year, next_month, day),
            tasks: vec![],
        });
        day += 1;
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Days, NaiveDate, Weekday};

    use super::{DayTasks, GRID_CELLS, advance, build_month_grid, build_month_grid_from_days};
    use crate::task::{Priority, Status, Task, TaskType};

    fn task(id: &str, due: Option<&str>) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            task_type: TaskType::General,
            status: Status::Pending,
            priority: Priority::Low,
            assignee: String::new(),
            due_date: due.and_then(crate::datetime::parse_due_date),
            due_time: None,
            note: None,
        }
    }

    #[test]
    fn every_grid_has_42_cells_aligned_sunday_to_saturday() {
        // Sweep a full Gregorian leap cycle.
        for year in 2000..2400 {
            for month in 1..=12 {
                let grid = build_month_grid(year, month, &[], None).expect("valid grid");
                assert_eq!(grid.cells.len(), GRID_CELLS);

                let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid first");
                let lead = first.weekday().num_days_from_sunday() as u64;
                let cell0 = first.checked_sub_days(Days::new(lead)).expect("cell 0 date");
                assert_eq!(cell0.weekday(), Weekday::Sun);
                assert_eq!(
                    cell0.checked_add_days(Days::new(41)).expect("cell 41 date").weekday(),
                    Weekday::Sat
                );
                assert_eq!(grid.cells[0].day, cell0.day());
            }
        }
    }

    #[test]
    fn leap_and_common_february_lengths() {
        let leap = build_month_grid(2024, 2, &[], None).expect("grid");
        assert_eq!(leap.cells.iter().filter(|c| c.month_offset == 0).count(), 29);

        let common = build_month_grid(2023, 2, &[], None).expect("grid");
        assert_eq!(common.cells.iter().filter(|c| c.month_offset == 0).count(), 28);
    }

    #[test]
    fn tasks_bind_once_and_never_to_overflow_cells() {
        // April 2025 starts on a Tuesday; cells 0-1 are March 30 and 31.
        let tasks = vec![
            task("march", Some("2025-03-30")),
            task("april", Some("2025-04-30")),
            task("dateless", None),
        ];
        let grid = build_month_grid(2025, 4, &tasks, None).expect("grid");

        assert_eq!(grid.cells[0].month_offset, -1);
        assert_eq!(grid.cells[0].day, 30);

        let total_bound: usize = grid.cells.iter().map(|c| c.tasks.len()).sum();
        assert_eq!(total_bound, 1);

        let cell = grid.cell_for_day(30).expect("april 30 cell");
        assert_eq!(cell.tasks.len(), 1);
        assert_eq!(cell.tasks[0].id, "april");
    }

    #[test]
    fn in_cell_order_follows_input_order() {
        let tasks = vec![
            task("b", Some("2025-06-15")),
            task("a", Some("2025-06-15")),
        ];
        let grid = build_month_grid(2025, 6, &tasks, None).expect("grid");
        let cell = grid.cell_for_day(15).expect("cell");
        let ids: Vec<&str> = cell.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn today_is_flagged_on_its_cell_only() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).expect("date");
        let grid = build_month_grid(2025, 6, &[], Some(today)).expect("grid");
        let flagged: Vec<(u32, i8)> = grid
            .cells
            .iter()
            .filter(|c| c.is_today)
            .map(|c| (c.day, c.month_offset))
            .collect();
        assert_eq!(flagged, [(15, 0)]);

        // Viewing the adjacent month flags the overflow cell for that date.
        let grid = build_month_grid(2025, 7, &[], Some(NaiveDate::from_ymd_opt(2025, 6, 30).expect("date")))
            .expect("grid");
        let flagged: Vec<(u32, i8)> = grid
            .cells
            .iter()
            .filter(|c| c.is_today)
            .map(|c| (c.day, c.month_offset))
            .collect();
        assert_eq!(flagged, [(30, -1)]);
    }

    #[test]
    fn invalid_month_is_rejected_not_clamped() {
        assert!(build_month_grid(2025, 0, &[], None).is_err());
        assert!(build_month_grid(2025, 13, &[], None).is_err());
    }

    #[test]
    fn prebucketed_days_bind_to_focal_cells() {
        let days = vec![
            DayTasks { day: 15, tasks: vec![task("x", Some("2025-06-15")), task("y", None)] },
            DayTasks { day: 40, tasks: vec![task("ignored", None)] },
        ];
        let grid = build_month_grid_from_days(2025, 6, &days, None).expect("grid");

        let cell = grid.cell_for_day(15).expect("cell");
        let ids: Vec<&str> = cell.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["x", "y"]);

        let total_bound: usize = grid.cells.iter().map(|c| c.tasks.len()).sum();
        assert_eq!(total_bound, 2);
    }

    #[test]
    fn navigator_round_trips_and_rolls_over_years() {
        assert_eq!(advance(2024, 12, 1), (2025, 1));
        assert_eq!(advance(2024, 1, -1), (2023, 12));
        assert_eq!(advance(2025, 6, 1), (2025, 7));

        for month in 1..=12u32 {
            let (y1, m1) = advance(2025, month, 1);
            assert_eq!(advance(y1, m1, -1), (2025, month));

            let mut pair = (2025, month);
            for _ in 0..12 {
                pair = advance(pair.0, pair.1, 1);
            }
            assert_eq!(pair, (2026, month));
        }
    }
}
