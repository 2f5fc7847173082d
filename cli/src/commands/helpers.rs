use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use resetliving_core::models::Task;

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => match s.as_str() {
            "today" => Ok(today()),
            "yesterday" => Ok(today() - chrono::Duration::days(1)),
            "tomorrow" => Ok(today() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Parse a work-day list: `1,2,3,4,5`, `weekdays`, `all`, or `mon,wed,fri`.
pub(crate) fn parse_work_days(s: &str) -> Result<Vec<u8>> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "weekdays" => return Ok(vec![1, 2, 3, 4, 5]),
        "all" => return Ok((0..=6).collect()),
        "weekends" => return Ok(vec![0, 6]),
        _ => {}
    }

    let mut days = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day = match part {
            "sun" | "sunday" | "dom" => 0,
            "mon" | "monday" | "seg" => 1,
            "tue" | "tuesday" | "ter" => 2,
            "wed" | "wednesday" | "qua" => 3,
            "thu" | "thursday" | "qui" => 4,
            "fri" | "friday" | "sex" => 5,
            "sat" | "saturday" | "sab" | "sáb" => 6,
            n => n
                .parse::<u8>()
                .ok()
                .filter(|d| *d <= 6)
                .with_context(|| format!("Invalid work day '{n}'. Use 0-6 or mon..sun"))?,
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    days.sort_unstable();
    Ok(days)
}

/// Resolve a task reference: an exact task id, or a 1-based position in the
/// listed tasks.
pub(crate) fn resolve_task_ref(tasks: &[Task], reference: &str) -> Result<String> {
    if let Some(t) = tasks.iter().find(|t| t.id == reference) {
        return Ok(t.id.clone());
    }
    if let Ok(n) = reference.parse::<usize>() {
        if n >= 1 && n <= tasks.len() {
            return Ok(tasks[n - 1].id.clone());
        }
    }
    bail!("No task '{reference}'. Use the # or ID shown by `resetliving today`")
}

pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

pub(crate) fn progress_bar(current: u32, total: u32, width: usize) -> String {
    let filled = if total == 0 {
        width
    } else {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let f = ((f64::from(current) / f64::from(total)) * width as f64).round() as usize;
        f.min(width)
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

pub(crate) fn print_task_table(tasks: &[Task]) {
    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "")]
        done: &'static str,
        #[tabled(rename = "Task")]
        title: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Reward")]
        reward: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| TaskRow {
            idx: i + 1,
            time: t.time.clone(),
            done: if t.completed { "[x]" } else { "[ ]" },
            title: truncate(&t.title, 40),
            kind: format!("{} {}", t.kind.icon(), t.kind.as_str()),
            reward: t.kind.badge().map_or_else(
                || match t.calories {
                    Some(kcal) => format!("+{} XP, {kcal} kcal", t.xp_reward),
                    None => format!("+{} XP", t.xp_reward),
                },
                str::to_string,
            ),
            id: truncate(&t.id, 24),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(5..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
