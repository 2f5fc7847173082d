use anyhow::Result;

use resetliving_core::service::WellnessService;

use crate::gemini::Planner;

use super::helpers::{print_task_table, today};

/// Ask for a new routine and recipes. XP, streak and histories are kept.
pub(crate) async fn cmd_plan_regenerate(
    svc: &WellnessService,
    planner: &Planner,
    json: bool,
) -> Result<()> {
    let profile = svc.profile(today())?;
    if !json {
        eprintln!("Generating a new plan for {}...", profile.name);
    }
    let plan = planner.generate_plan(&profile).await;
    let state = svc.apply_plan(plan, today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!(
        "New plan: {} tasks, {} recipes, water goal {} ml\n",
        state.daily_schedule.len(),
        state.recipes.len(),
        state.water_intake_goal
    );
    print_task_table(&state.daily_schedule);
    Ok(())
}
