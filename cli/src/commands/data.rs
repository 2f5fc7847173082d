use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use resetliving_core::service::WellnessService;

use super::helpers::{confirm, json_error, today};

/// Export the full state as JSON, or weight and mood history as CSV.
/// Writes to stdout unless an output path is given.
pub(crate) fn cmd_export(svc: &WellnessService, csv: bool, output: Option<PathBuf>) -> Result<()> {
    let today = today();
    match (csv, output) {
        (false, None) => println!("{}", svc.export_json(today)?),
        (false, Some(path)) => {
            std::fs::write(&path, svc.export_json(today)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported state to {}", path.display());
        }
        (true, None) => {
            svc.export_history_csv(std::io::stdout().lock(), today)?;
        }
        (true, Some(path)) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = svc.export_history_csv(file, today)?;
            eprintln!("Exported {rows} history rows to {}", path.display());
        }
    }
    Ok(())
}

pub(crate) fn cmd_import(svc: &WellnessService, file: &Path, json: bool) -> Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let state = svc.import_json(&data)?;

    if json {
        println!(
            "{}",
            json!({
                "imported": true,
                "hasOnboarded": state.has_onboarded,
                "tasks": state.daily_schedule.len(),
                "userXP": state.user_xp,
            })
        );
    } else {
        let name = state.profile.as_ref().map_or("(no profile)", |p| p.name.as_str());
        println!(
            "Imported state for {name}: level {}, {} XP, {} tasks",
            state.user_level,
            state.user_xp,
            state.daily_schedule.len()
        );
    }
    Ok(())
}

pub(crate) fn cmd_reset(svc: &WellnessService, yes: bool, json: bool) -> Result<()> {
    if !yes && !confirm("Delete your profile, plan and all progress?")? {
        if json {
            println!("{}", json_error("Reset cancelled"));
        } else {
            eprintln!("Reset cancelled");
        }
        return Ok(());
    }
    svc.reset()?;
    if json {
        println!("{}", json!({ "reset": true }));
    } else {
        println!("All data deleted. Run `resetliving onboard` to start again.");
    }
    Ok(())
}
