use anyhow::Result;
use serde_json::json;

use resetliving_core::service::WellnessService;

use super::helpers::{progress_bar, today};
use super::today::print_award;

pub(crate) fn cmd_water(svc: &WellnessService, amount_ml: u32, json: bool) -> Result<()> {
    let (state, award) = svc.add_water(amount_ml, today())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "waterIntakeCurrent": state.water_intake_current,
                "waterIntakeGoal": state.water_intake_goal,
                "award": award,
            }))?
        );
        return Ok(());
    }

    println!(
        "Water: {} / {} ml {}",
        state.water_intake_current,
        state.water_intake_goal,
        progress_bar(state.water_intake_current, state.water_intake_goal, 20)
    );
    print_award(&award);
    Ok(())
}
