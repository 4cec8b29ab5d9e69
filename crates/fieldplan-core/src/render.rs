use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::MonthGrid;
use crate::config::Config;
use crate::task::Task;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color_enabled()?,
        })
    }

    /// Print the 42-cell month grid, one row per week. Overflow days are
    /// dimmed, today is highlighted, and a day with tasks gets a marker.
    #[tracing::instrument(skip(self, grid))]
    pub fn print_month_grid(&mut self, grid: &MonthGrid<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let month_name = MONTH_NAMES
            .get(grid.month as usize - 1)
            .copied()
            .unwrap_or("?");
        writeln!(out, "{:^28}", format!("{} {}", month_name, grid.year))?;
        writeln!(out, " Su  Mo  Tu  We  Th  Fr  Sa")?;

        for week in grid.cells.chunks(7) {
            for cell in week {
                let marker = if cell.tasks.is_empty() { ' ' } else { '*' };
                let text = format!("{:>3}{marker}", cell.day);
                let painted = if cell.is_today {
                    self.paint(&text, "36;1")
                } else if cell.month_offset != 0 {
                    self.paint(&text, "90")
                } else {
                    text
                };
                write!(out, "{painted}")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[&Task], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Time".to_string(),
            "Type".to_string(),
            "Pri".to_string(),
            "Status".to_string(),
            "Assignee".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(short_id(&task.id), "33");

            let due = task
                .due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let due = match task.due_date {
                Some(date) if date < today && !task.is_completed() => self.paint(&due, "31"),
                _ => due,
            };

            let time = task
                .due_time
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_default();

            rows.push(vec![
                id,
                due,
                time,
                task.task_type.as_str().to_string(),
                task.priority.as_str().to_string(),
                task.status.as_str().to_string(),
                task.assignee.clone(),
                task.title.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
