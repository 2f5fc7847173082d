use anyhow::Result;
use serde_json::json;

use resetliving_core::progression::Award;
use resetliving_core::service::WellnessService;

use super::helpers::{print_task_table, progress_bar, resolve_task_ref, today};

pub(crate) fn cmd_today(svc: &WellnessService, json: bool) -> Result<()> {
    let dash = svc.dashboard(today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
        return Ok(());
    }

    let level = &dash.level;
    println!("=== {} ===\n", dash.date.format("%A, %Y-%m-%d"));
    println!("  Hello, {}!", dash.name);
    println!(
        "  Level {}  {} {} XP to next level",
        level.level,
        progress_bar(level.xp_into_level, level.xp_into_level + level.xp_to_next_level, 20),
        level.xp_to_next_level
    );
    println!("  Streak: {} day(s)  Total XP: {}", dash.streak_days, dash.xp);
    println!(
        "  Water: {} / {} ml {}",
        dash.water_intake_current,
        dash.water_intake_goal,
        progress_bar(dash.water_intake_current, dash.water_intake_goal, 20)
    );
    match dash.mood {
        Some(m) => println!("  Mood: {} {}", m.emoji(), m.as_str()),
        None => println!("  Mood: not recorded (resetliving mood <great|good|ok|tired|bad>)"),
    }
    println!();

    if dash.tasks.is_empty() {
        eprintln!("No tasks scheduled for today");
        return Ok(());
    }
    println!("  Tasks: {}/{} done", dash.completed_tasks, dash.tasks.len());
    print_task_table(&dash.tasks);
    Ok(())
}

pub(crate) fn print_award(award: &Award) {
    if award.xp_gained > 0 {
        println!("  +{} XP", award.xp_gained);
    }
    if award.water_goal_reached() {
        println!("  Water goal reached! Bonus XP included.");
    }
    if let Some(level) = award.level_up() {
        println!("  LEVEL UP! You are now level {level}.");
    }
}

/// Complete a task by id or by its position in `resetliving today`.
pub(crate) fn cmd_done(svc: &WellnessService, task_ref: &str, json: bool) -> Result<()> {
    let today = today();
    let visible = svc.dashboard(today)?.tasks;
    let id = resolve_task_ref(&visible, task_ref)?;
    let (task, award) = svc.complete_task(&id, today)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "task": task, "award": award }))?
        );
    } else if award.xp_gained == 0 {
        println!("'{}' was already completed", task.title);
    } else {
        println!("Completed '{}'", task.title);
        print_award(&award);
    }
    Ok(())
}
