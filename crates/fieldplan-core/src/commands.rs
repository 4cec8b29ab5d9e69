use anyhow::{Context, anyhow, bail};
use chrono::{Datelike, Local, NaiveDateTime};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::controller::{CalendarController, CalendarSource, FetchOutcome, PlannerController, TaskSource};
use crate::datastore::DataStore;
use crate::datetime::{parse_due_date, parse_due_time};
use crate::filter::FilterSelector;
use crate::normalize::{RawTaskRecord, RawTimeline};
use crate::render::Renderer;
use crate::task::{Priority, TaskType};

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    scope_override: Option<&str>,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Local::now().naive_local();
    let scope = scope_override.unwrap_or_else(|| cfg.default_scope()).to_string();

    debug!(command = %inv.command, args = ?inv.args, scope = %scope, "dispatching command");

    match inv.command.as_str() {
        "calendar" => cmd_calendar(store, renderer, &inv.args, now),
        "list" => cmd_list(store, renderer, &scope, &inv.args, now),
        "add" => cmd_add(store, &scope, &inv.args),
        "done" => cmd_done(store, &inv.args),
        "delete" => cmd_delete(store, &inv.args),
        "sync" => cmd_sync(store, &scope),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_calendar(
    store: &DataStore,
    renderer: &mut Renderer,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command calendar");

    let today = now.date();
    let (year, month) = match args.first() {
        Some(arg) => parse_focal_month(arg)?,
        None => (today.year(), today.month()),
    };

    let mut ctl = CalendarController::new(year, month)?;
    let ticket = ctl.sync();
    let outcome = ctl.resolve_days(ticket, store.fetch_calendar_days(year, month));
    if outcome == FetchOutcome::Failed {
        bail!(
            "calendar fetch failed: {}",
            ctl.error().unwrap_or("unknown error")
        );
    }

    let grid = ctl.grid(Some(today))?;
    renderer.print_month_grid(&grid)?;

    let due_this_month: Vec<_> = grid
        .cells
        .iter()
        .filter(|cell| cell.month_offset == 0)
        .flat_map(|cell| cell.tasks.iter().copied())
        .collect();
    if !due_this_month.is_empty() {
        println!();
        renderer.print_task_table(&due_this_month, today)?;
    }

    Ok(())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_list(
    store: &DataStore,
    renderer: &mut Renderer,
    scope: &str,
    args: &[String],
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command list");

    let mut planner = PlannerController::new(scope);
    let ticket = planner.sync();
    let outcome = planner.resolve(ticket, store.fetch_tasks(scope));
    if outcome == FetchOutcome::Failed {
        bail!(
            "task fetch failed: {}",
            planner.error().unwrap_or("unknown error")
        );
    }

    let (selector, query_terms) = match args.split_first() {
        Some((first, rest)) => match FilterSelector::parse(first) {
            Some(selector) => (selector, rest),
            None => (FilterSelector::All, args),
        },
        None => (FilterSelector::All, args),
    };
    planner.set_selector(selector);
    planner.set_query(&query_terms.join(" "));

    let visible = planner.visible(now);
    renderer.print_task_table(&visible, now.date())?;
    println!(
        "\n{} of {} tasks ({})",
        visible.len(),
        planner.tasks().len(),
        selector.label()
    );

    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_add(store: &DataStore, scope: &str, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    let mut record = parse_new_record(args)?;
    if record.scope.is_none() && scope != "default" {
        record.scope = Some(scope.to_string());
    }

    let id = record.id.clone();
    store.add_record(record)?;

    println!("Created task {id}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_done(store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command done");

    let id = args.first().ok_or_else(|| anyhow!("done requires a task id"))?;
    store.update_record(id, |record| {
        record.status = Some("completed".to_string());
        record.completed = Some(true);
    })?;

    println!("Completed task {id}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &DataStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let id = args.first().ok_or_else(|| anyhow!("delete requires a task id"))?;
    store.delete_record(id)?;

    println!("Deleted task {id}.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_sync(store: &DataStore, scope: &str) -> anyhow::Result<()> {
    info!("command sync");

    let mut planner = PlannerController::new(scope);
    let ticket = planner.sync();
    let outcome = planner.resolve(ticket, store.fetch_tasks(scope));
    if outcome == FetchOutcome::Failed {
        bail!(
            "task fetch failed: {}",
            planner.error().unwrap_or("unknown error")
        );
    }

    println!("Synced {} tasks for scope {scope}.", planner.tasks().len());
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: fieldplan [flags] <command> [args]");
    println!();
    println!("  calendar [YYYY-MM]          month grid with task markers");
    println!("  list [selector] [query..]   planner list; selectors: all, today,");
    println!("                              week, overdue, completed, crop,");
    println!("                              livestock, equipment, general");
    println!("  add <title.. mods..>        mods: due:YYYY-MM-DD time:HH:MM");
    println!("                              type:.. pri:.. assignee:.. note:.. scope:..");
    println!("  done <id>                   mark a task completed");
    println!("  delete <id>                 remove a task");
    println!("  sync                        refresh the scope's task list");
    Ok(())
}

fn parse_focal_month(arg: &str) -> anyhow::Result<(i32, u32)> {
    let (year_text, month_text) = arg
        .split_once('-')
        .ok_or_else(|| anyhow!("expected YYYY-MM, got: {arg}"))?;
    let year: i32 = year_text
        .parse()
        .with_context(|| format!("invalid year in: {arg}"))?;
    let month: u32 = month_text
        .parse()
        .with_context(|| format!("invalid month in: {arg}"))?;
    if !(1..=12).contains(&month) {
        bail!("month out of range 1-12: {month}");
    }
    Ok((year, month))
}

/// Build a new raw record from `add` arguments: plain words form the
/// title, `key:value` tokens are modifiers, `--` makes the remainder
/// literal title text.
fn parse_new_record(args: &[String]) -> anyhow::Result<RawTaskRecord> {
    let mut title_parts: Vec<String> = Vec::new();
    let mut record = RawTaskRecord {
        id: Uuid::new_v4().to_string(),
        status: Some("pending".to_string()),
        ..RawTaskRecord::default()
    };
    let mut due_date: Option<String> = None;
    let mut due_time: Option<String> = None;

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some((key, value)) = arg.split_once(':') {
            match key.to_ascii_lowercase().as_str() {
                "due" => {
                    parse_due_date(value).ok_or_else(|| anyhow!("invalid due date: {value}"))?;
                    due_date = Some(value.to_string());
                    continue;
                }
                "time" => {
                    parse_due_time(value).ok_or_else(|| anyhow!("invalid due time: {value}"))?;
                    due_time = Some(value.to_string());
                    continue;
                }
                "type" => {
                    let task_type = TaskType::parse(value)
                        .ok_or_else(|| anyhow!("unknown task type: {value}"))?;
                    record.task_type = Some(task_type.as_str().to_string());
                    continue;
                }
                "pri" | "priority" => {
                    let priority = Priority::parse(value)
                        .ok_or_else(|| anyhow!("unknown priority: {value}"))?;
                    record.priority = Some(priority.as_str().to_string());
                    continue;
                }
                "assignee" => {
                    record.assignee = Some(value.to_string());
                    continue;
                }
                "note" => {
                    record.note = Some(value.to_string());
                    continue;
                }
                "scope" => {
                    record.scope = Some(value.to_string());
                    continue;
                }
                _ => {}
            }
        }

        title_parts.push(arg.clone());
    }

    if title_parts.is_empty() {
        bail!("add: title is required");
    }
    record.title = title_parts.join(" ");

    if due_date.is_some() || due_time.is_some() {
        record.timeline = Some(RawTimeline { due_date, due_time });
    }

    Ok(record)
}
