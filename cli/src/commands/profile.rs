use anyhow::Result;
use serde_json::json;

use resetliving_core::progression::{healthy_weight_range, level_progress};
use resetliving_core::service::WellnessService;

use super::helpers::{progress_bar, today};

/// Share of the start → target distance already covered, 0..=100.
fn goal_progress(start: f64, current: f64, target: f64) -> f64 {
    let total = start - target;
    if total.abs() < f64::EPSILON {
        return 100.0;
    }
    ((start - current) / total * 100.0).clamp(0.0, 100.0)
}

pub(crate) fn cmd_profile(svc: &WellnessService, json: bool) -> Result<()> {
    let state = svc.state(today())?;
    let profile = svc.profile(today())?;
    let (low, high) = healthy_weight_range(profile.height);
    let progress = goal_progress(profile.start_weight, profile.weight, profile.target_weight);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "profile": profile,
                "healthyWeightRange": [low, high],
                "goalProgress": progress,
                "level": level_progress(state.user_xp),
                "streakDays": state.streak_days,
            }))?
        );
        return Ok(());
    }

    println!("=== {} ===\n", profile.name);
    println!(
        "  {} years, {:.0} cm, {}",
        profile.age,
        profile.height,
        profile.gender.label()
    );
    println!("  Activity: {}", profile.activity_level.label());
    println!(
        "  Routine: wake {} / bed {} / work {}",
        profile.wake_up_time, profile.bed_time, profile.work_schedule
    );
    if let Some(days) = &profile.work_days {
        let names: Vec<&str> = days
            .iter()
            .map(|d| ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"][usize::from(*d % 7)])
            .collect();
        println!("  Work days: {}", names.join(", "));
    }
    println!("  Goals: {}", profile.goals);
    if !profile.dietary_restrictions.is_empty() {
        println!("  Restrictions: {}", profile.dietary_restrictions);
    }
    println!();
    println!(
        "  BMI: {:.1} ({})  Healthy range: {low:.1} - {high:.1} kg",
        profile.bmi,
        profile.bmi_category.label()
    );
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = progress.round() as u32;
    println!(
        "  Weight: {:.1} → {:.1} kg {} {pct}%",
        profile.start_weight,
        profile.target_weight,
        progress_bar(pct, 100, 20)
    );
    println!(
        "  Level {}  ({} XP, {} day streak)",
        state.user_level, state.user_xp, state.streak_days
    );
    Ok(())
}
