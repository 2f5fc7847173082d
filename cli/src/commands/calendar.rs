use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use serde_json::json;

use resetliving_core::calendar::{DEFAULT_FILE_NAME, build_calendar};
use resetliving_core::service::WellnessService;

use super::helpers::today;

pub(crate) fn cmd_calendar_export(
    svc: &WellnessService,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let today = today();
    let state = svc.state(today)?;
    let Some(ics) = build_calendar(&state.daily_schedule, today, &Local, Utc::now()) else {
        bail!("No tasks to export. Complete onboarding first");
    };

    let path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));
    std::fs::write(&path, &ics)
        .with_context(|| format!("Failed to write calendar: {}", path.display()))?;
    let events = ics.matches("BEGIN:VEVENT").count();

    if json {
        println!("{}", json!({ "path": path, "events": events }));
    } else {
        println!("Exported {events} events to {}", path.display());
        println!("Import the file into your calendar app to get reminders on other devices.");
    }
    Ok(())
}
