//! State transitions for the daily routine: day rollover, task completion,
//! XP and levels, hydration, mood and weigh-ins.
//!
//! Every function here is total. Unknown task ids or a missing profile leave
//! the state untouched instead of failing; callers guard preconditions they
//! care about before invoking.

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use crate::models::{
    AppState, BmiCategory, GeneratedPlan, Mood, MoodEntry, OnboardingForm, Profile,
    Recipe, Task, WeightEntry, XP_PER_LEVEL,
};

pub const WATER_XP: u32 = 10;
pub const WATER_GOAL_BONUS_XP: u32 = 50;

/// Something the caller should surface to the user. Not part of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    LevelUp { level: u32 },
    WaterGoalReached { bonus_xp: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Award {
    pub xp_gained: u32,
    pub events: Vec<ProgressEvent>,
}

impl Award {
    #[must_use]
    pub fn level_up(&self) -> Option<u32> {
        self.events.iter().find_map(|e| match e {
            ProgressEvent::LevelUp { level } => Some(*level),
            ProgressEvent::WaterGoalReached { .. } => None,
        })
    }

    #[must_use]
    pub fn water_goal_reached(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, ProgressEvent::WaterGoalReached { .. }))
    }
}

#[must_use]
pub fn level_for_xp(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_into_level: u32,
    pub xp_to_next_level: u32,
    pub percent: f64,
}

#[must_use]
pub fn level_progress(xp: u32) -> LevelProgress {
    let into = xp % XP_PER_LEVEL;
    LevelProgress {
        level: level_for_xp(xp),
        xp_into_level: into,
        xp_to_next_level: XP_PER_LEVEL - into,
        percent: f64::from(into) / f64::from(XP_PER_LEVEL) * 100.0,
    }
}

/// BMI rounded to one decimal place.
#[must_use]
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    (bmi * 10.0).round() / 10.0
}

/// Weight range (kg) that keeps BMI within 18.5..=24.9 for the given height.
#[must_use]
pub fn healthy_weight_range(height_cm: f64) -> (f64, f64) {
    let h = height_cm / 100.0;
    (18.5 * h * h, 24.9 * h * h)
}

/// Start a new day if `today` differs from the last login date.
///
/// Returns `true` when the state changed. The streak grows on every
/// rollover, even after skipped days.
pub fn roll_over_day(state: &mut AppState, today: NaiveDate) -> bool {
    if state.last_login_date == today {
        return false;
    }
    state.last_login_date = today;
    state.water_intake_current = 0;
    for task in &mut state.daily_schedule {
        task.completed = false;
    }
    state.streak_days += 1;
    log::debug!("day rolled over to {today}, streak {}", state.streak_days);
    true
}

fn grant_xp(state: &mut AppState, xp: u32, award: &mut Award) {
    let old_level = state.user_level;
    state.user_xp = state.user_xp.saturating_add(xp);
    state.user_level = level_for_xp(state.user_xp);
    award.xp_gained += xp;
    if state.user_level > old_level {
        award.events.push(ProgressEvent::LevelUp {
            level: state.user_level,
        });
    }
}

/// Mark a task done and grant its XP. Completion is one-way: completing a
/// task twice grants nothing.
pub fn complete_task(state: &mut AppState, task_id: &str) -> Award {
    let mut award = Award::default();
    let Some(task) = state
        .daily_schedule
        .iter_mut()
        .find(|t| t.id == task_id && !t.completed)
    else {
        return award;
    };
    task.completed = true;
    let xp = task.xp_reward;
    grant_xp(state, xp, &mut award);
    award
}

/// Log a glass (or any amount) of water. The goal bonus is paid only on the
/// call that crosses the goal.
pub fn add_water(state: &mut AppState, amount_ml: u32) -> Award {
    let mut award = Award::default();
    let before = state.water_intake_current;
    let after = before.saturating_add(amount_ml);
    state.water_intake_current = after;

    let mut xp = WATER_XP;
    let crossed = before < state.water_intake_goal && after >= state.water_intake_goal;
    if crossed {
        xp += WATER_GOAL_BONUS_XP;
        award.events.push(ProgressEvent::WaterGoalReached {
            bonus_xp: WATER_GOAL_BONUS_XP,
        });
    }
    grant_xp(state, xp, &mut award);
    award
}

pub fn set_mood(state: &mut AppState, date: NaiveDate, mood: Mood) {
    state.mood_history.retain(|m| m.date != date);
    state.mood_history.push(MoodEntry { date, mood });
}

/// Record a weigh-in and refresh the derived BMI from the latest-dated entry.
/// Returns `false` when there is no profile to update.
pub fn record_weight(state: &mut AppState, date: NaiveDate, weight_kg: f64) -> bool {
    let Some(profile) = state.profile.as_mut() else {
        return false;
    };

    match profile.weight_history.iter_mut().find(|e| e.date == date) {
        Some(entry) => entry.weight = weight_kg,
        None => profile.weight_history.push(WeightEntry {
            date,
            weight: weight_kg,
        }),
    }
    profile.weight_history.sort_by_key(|e| e.date);

    // A back-dated weigh-in must not replace a newer current weight.
    let current = profile
        .weight_history
        .last()
        .map_or(weight_kg, |e| e.weight);
    let bmi = calculate_bmi(current, profile.height);
    profile.weight = current;
    profile.bmi = bmi;
    profile.bmi_category = BmiCategory::from_bmi(bmi);
    true
}

/// Swap in a freshly generated plan. Progress (XP, level, streak, histories)
/// is kept.
pub fn apply_generated_plan(state: &mut AppState, plan: GeneratedPlan) {
    state.daily_schedule = plan.tasks;
    state.recipes = plan.recipes;
    state.water_intake_goal = plan.water_goal;
}

/// Replace the recipe list, ignoring empty suggestion sets.
pub fn apply_recipe_suggestions(state: &mut AppState, recipes: Vec<Recipe>) -> bool {
    if recipes.is_empty() {
        return false;
    }
    state.recipes = recipes;
    true
}

/// Derive the stored profile from questionnaire answers.
#[must_use]
pub fn build_profile(form: OnboardingForm, today: NaiveDate) -> Profile {
    let bmi = calculate_bmi(form.weight, form.height);
    let target_weight = form
        .target_weight
        .filter(|w| *w > 0.0)
        .unwrap_or(form.weight);
    Profile {
        name: form.name.trim().to_string(),
        age: form.age,
        weight: form.weight,
        start_weight: form.weight,
        target_weight,
        weight_history: vec![WeightEntry {
            date: today,
            weight: form.weight,
        }],
        height: form.height,
        bmi,
        bmi_category: BmiCategory::from_bmi(bmi),
        gender: form.gender,
        wake_up_time: form.wake_up_time,
        bed_time: form.bed_time,
        work_schedule: form.work_schedule,
        work_days: form.work_days,
        activity_level: form.activity_level,
        goals: form.goals,
        dietary_restrictions: form.dietary_restrictions,
    }
}

/// Finish onboarding: install the profile and first plan and start progress
/// from scratch.
pub fn complete_onboarding(
    state: &mut AppState,
    profile: Profile,
    plan: GeneratedPlan,
    today: NaiveDate,
) {
    state.has_onboarded = true;
    state.profile = Some(profile);
    apply_generated_plan(state, plan);
    state.user_xp = 0;
    state.user_level = 1;
    state.streak_days = 1;
    state.last_login_date = today;
    state.water_intake_current = 0;
    state.mood_history.clear();
}

/// Incomplete tasks scheduled at exactly `now_hhmm`.
#[must_use]
pub fn due_tasks<'a>(state: &'a AppState, now_hhmm: &str) -> Vec<&'a Task> {
    state
        .daily_schedule
        .iter()
        .filter(|t| t.time == now_hhmm && !t.completed)
        .collect()
}

/// Tasks to show for the given weekday, ordered by time. Work and commute
/// tasks are hidden on days that are not work days.
#[must_use]
pub fn visible_schedule(state: &AppState, weekday: Weekday) -> Vec<&Task> {
    let day = weekday.num_days_from_sunday() as u8;
    let is_work_day = state
        .profile
        .as_ref()
        .and_then(|p| p.work_days.as_ref())
        .is_none_or(|days| days.contains(&day));

    let mut tasks: Vec<&Task> = state
        .daily_schedule
        .iter()
        .filter(|t| is_work_day || !t.kind.is_work_related())
        .collect();
    tasks.sort_by(|a, b| a.time.cmp(&b.time));
    tasks
}

#[must_use]
pub fn average_recipe_calories(recipes: &[Recipe]) -> u32 {
    if recipes.is_empty() {
        return 0;
    }
    let total: u64 = recipes.iter().map(|r| u64::from(r.calories)).sum();
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let avg = (total as f64 / recipes.len() as f64).round() as u32;
    avg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, GLASS_ML, Gender, TaskType};
    use crate::plan::fallback_plan;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: &str, time: &str, kind: TaskType, xp: u32) -> Task {
        Task {
            id: id.to_string(),
            time: time.to_string(),
            title: format!("Task {id}"),
            description: String::new(),
            kind,
            completed: false,
            xp_reward: xp,
            calories: None,
        }
    }

    fn form() -> OnboardingForm {
        OnboardingForm {
            name: " Ana ".to_string(),
            age: 32,
            weight: 90.0,
            height: 180.0,
            target_weight: Some(80.0),
            gender: Gender::Female,
            wake_up_time: "07:00".to_string(),
            bed_time: "23:00".to_string(),
            work_schedule: "09:00 - 18:00".to_string(),
            work_days: None,
            activity_level: ActivityLevel::Sedentary,
            goals: "Emagrecer".to_string(),
            dietary_restrictions: String::new(),
        }
    }

    fn onboarded_state() -> AppState {
        let today = date(2024, 1, 1);
        let mut state = AppState::new(today);
        let profile = build_profile(form(), today);
        complete_onboarding(&mut state, profile, fallback_plan(), today);
        state
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(999), 1);
        assert_eq!(level_for_xp(1000), 2);
        assert_eq!(level_for_xp(2500), 3);
        let mut prev = level_for_xp(0);
        for xp in (0..10_000).step_by(37) {
            let level = level_for_xp(xp);
            assert!(level >= prev);
            assert_eq!(level, xp / 1000 + 1);
            prev = level;
        }
    }

    #[test]
    fn test_level_progress() {
        let p = level_progress(1250);
        assert_eq!(p.level, 2);
        assert_eq!(p.xp_into_level, 250);
        assert_eq!(p.xp_to_next_level, 750);
        assert!((p.percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roll_over_same_day_is_noop() {
        let mut state = onboarded_state();
        state.water_intake_current = 500;
        state.daily_schedule[0].completed = true;
        let before = state.clone();

        assert!(!roll_over_day(&mut state, date(2024, 1, 1)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_roll_over_new_day_resets() {
        let mut state = onboarded_state();
        state.water_intake_current = 1750;
        for t in &mut state.daily_schedule {
            t.completed = true;
        }
        state.user_xp = 420;

        assert!(roll_over_day(&mut state, date(2024, 1, 2)));
        assert_eq!(state.water_intake_current, 0);
        assert!(state.daily_schedule.iter().all(|t| !t.completed));
        assert_eq!(state.streak_days, 2);
        assert_eq!(state.last_login_date, date(2024, 1, 2));
        assert_eq!(state.user_xp, 420);

        // Idempotent within the day
        let after = state.clone();
        assert!(!roll_over_day(&mut state, date(2024, 1, 2)));
        assert_eq!(state, after);
    }

    #[test]
    fn test_roll_over_after_gap_still_increments_once() {
        let mut state = onboarded_state();
        roll_over_day(&mut state, date(2024, 1, 10));
        assert_eq!(state.streak_days, 2);
    }

    #[test]
    fn test_complete_task_grants_xp_once() {
        let mut state = AppState::new(date(2024, 1, 1));
        state.daily_schedule = vec![task("a", "07:00", TaskType::Meal, 30)];

        let award = complete_task(&mut state, "a");
        assert_eq!(award.xp_gained, 30);
        assert!(award.events.is_empty());
        assert!(state.daily_schedule[0].completed);
        assert_eq!(state.user_xp, 30);

        let before = state.clone();
        let again = complete_task(&mut state, "a");
        assert_eq!(again, Award::default());
        assert_eq!(state, before);
    }

    #[test]
    fn test_complete_unknown_task_is_noop() {
        let mut state = onboarded_state();
        let before = state.clone();
        let award = complete_task(&mut state, "missing");
        assert_eq!(award.xp_gained, 0);
        assert_eq!(state, before);
    }

    #[test]
    fn test_complete_task_level_up() {
        let mut state = AppState::new(date(2024, 1, 1));
        state.user_xp = 980;
        state.daily_schedule = vec![task("w", "19:00", TaskType::WorkoutApp, 50)];

        let award = complete_task(&mut state, "w");
        assert_eq!(award.level_up(), Some(2));
        assert_eq!(state.user_level, 2);
        assert_eq!(state.user_xp, 1030);
    }

    #[test]
    fn test_add_water_goal_crossing() {
        let mut state = AppState::new(date(2024, 1, 1));
        state.water_intake_goal = 2500;
        state.water_intake_current = 2400;

        let award = add_water(&mut state, 250);
        assert_eq!(state.water_intake_current, 2650);
        assert_eq!(award.xp_gained, 60);
        assert!(award.water_goal_reached());
        assert_eq!(state.user_xp, 60);

        // Already above goal: base XP only
        let award = add_water(&mut state, 250);
        assert_eq!(award.xp_gained, 10);
        assert!(!award.water_goal_reached());
        assert_eq!(state.user_xp, 70);
    }

    #[test]
    fn test_add_water_exactly_hits_goal() {
        let mut state = AppState::new(date(2024, 1, 1));
        state.water_intake_goal = 500;
        state.water_intake_current = 250;
        let award = add_water(&mut state, GLASS_ML);
        assert!(award.water_goal_reached());
        assert_eq!(state.water_intake_current, 500);
    }

    #[test]
    fn test_add_water_below_goal() {
        let mut state = AppState::new(date(2024, 1, 1));
        let award = add_water(&mut state, 250);
        assert_eq!(award.xp_gained, WATER_XP);
        assert_eq!(state.water_intake_current, 250);
        assert_eq!(state.user_level, 1);
    }

    #[test]
    fn test_set_mood_upserts_by_date() {
        let mut state = AppState::new(date(2024, 1, 1));
        set_mood(&mut state, date(2024, 1, 1), Mood::Ok);
        set_mood(&mut state, date(2024, 1, 1), Mood::Great);
        set_mood(&mut state, date(2024, 1, 2), Mood::Tired);

        assert_eq!(state.mood_history.len(), 2);
        assert_eq!(state.mood_on(date(2024, 1, 1)), Some(Mood::Great));
        assert_eq!(state.mood_on(date(2024, 1, 2)), Some(Mood::Tired));
    }

    #[test]
    fn test_record_weight_upsert() {
        let mut state = onboarded_state();
        let profile = state.profile.as_mut().unwrap();
        profile.weight_history = vec![WeightEntry {
            date: date(2024, 1, 1),
            weight: 90.0,
        }];

        assert!(record_weight(&mut state, date(2024, 1, 1), 88.0));
        let profile = state.profile.as_ref().unwrap();
        assert_eq!(
            profile.weight_history,
            vec![WeightEntry {
                date: date(2024, 1, 1),
                weight: 88.0
            }]
        );
        assert!((profile.bmi - 27.2).abs() < 1e-9);
        assert_eq!(profile.bmi_category.label(), "Sobrepeso");
        assert!((profile.weight - 88.0).abs() < f64::EPSILON);

        assert!(record_weight(&mut state, date(2024, 1, 2), 87.0));
        assert_eq!(state.profile.as_ref().unwrap().weight_history.len(), 2);
    }

    #[test]
    fn test_record_weight_backfill_keeps_latest_current() {
        let mut state = onboarded_state();
        assert!(record_weight(&mut state, date(2024, 1, 5), 85.0));
        assert!(record_weight(&mut state, date(2023, 12, 20), 90.0));

        let profile = state.profile.as_ref().unwrap();
        let dates: Vec<NaiveDate> = profile.weight_history.iter().map(|e| e.date).collect();
        assert_eq!(
            dates,
            vec![date(2023, 12, 20), date(2024, 1, 1), date(2024, 1, 5)]
        );
        assert!((profile.weight - 85.0).abs() < f64::EPSILON);
        assert!((profile.bmi - calculate_bmi(85.0, profile.height)).abs() < 1e-9);
    }

    #[test]
    fn test_record_weight_without_profile_is_noop() {
        let mut state = AppState::new(date(2024, 1, 1));
        let before = state.clone();
        assert!(!record_weight(&mut state, date(2024, 1, 1), 80.0));
        assert_eq!(state, before);
    }

    #[test]
    fn test_calculate_bmi() {
        assert!((calculate_bmi(88.0, 180.0) - 27.2).abs() < 1e-9);
        assert!((calculate_bmi(60.0, 165.0) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_healthy_weight_range() {
        let (min, max) = healthy_weight_range(180.0);
        assert!((min - 59.94).abs() < 1e-6);
        assert!((max - 80.676).abs() < 1e-6);
    }

    #[test]
    fn test_apply_generated_plan_preserves_progress() {
        let mut state = onboarded_state();
        state.user_xp = 1500;
        state.user_level = 2;
        state.streak_days = 9;
        set_mood(&mut state, date(2024, 1, 1), Mood::Good);
        record_weight(&mut state, date(2024, 1, 3), 85.0);
        let history = state.profile.as_ref().unwrap().weight_history.clone();

        let plan = GeneratedPlan {
            tasks: vec![task("n1", "06:30", TaskType::Exercise, 40)],
            recipes: vec![],
            water_goal: 3000,
        };
        apply_generated_plan(&mut state, plan);

        assert_eq!(state.daily_schedule.len(), 1);
        assert!(state.recipes.is_empty());
        assert_eq!(state.water_intake_goal, 3000);
        assert_eq!(state.user_xp, 1500);
        assert_eq!(state.user_level, 2);
        assert_eq!(state.streak_days, 9);
        assert_eq!(state.mood_history.len(), 1);
        assert_eq!(state.profile.as_ref().unwrap().weight_history, history);
    }

    #[test]
    fn test_apply_recipe_suggestions_ignores_empty() {
        let mut state = onboarded_state();
        let before = state.recipes.clone();
        assert!(!apply_recipe_suggestions(&mut state, vec![]));
        assert_eq!(state.recipes, before);

        let mut replacement = before[0].clone();
        replacement.id = "new-recipe-1-0".to_string();
        assert!(apply_recipe_suggestions(&mut state, vec![replacement]));
        assert_eq!(state.recipes.len(), 1);
    }

    #[test]
    fn test_build_profile_derives_metrics() {
        let today = date(2024, 3, 5);
        let profile = build_profile(form(), today);
        assert_eq!(profile.name, "Ana");
        assert!((profile.start_weight - 90.0).abs() < f64::EPSILON);
        assert!((profile.target_weight - 80.0).abs() < f64::EPSILON);
        assert!((profile.bmi - 27.8).abs() < 1e-9);
        assert_eq!(profile.bmi_category, BmiCategory::Overweight);
        assert_eq!(
            profile.weight_history,
            vec![WeightEntry {
                date: today,
                weight: 90.0
            }]
        );
    }

    #[test]
    fn test_build_profile_target_falls_back_to_weight() {
        let mut f = form();
        f.target_weight = None;
        let profile = build_profile(f, date(2024, 1, 1));
        assert!((profile.target_weight - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_complete_onboarding_resets_progress() {
        let today = date(2024, 1, 1);
        let mut state = AppState::new(today);
        state.user_xp = 400;
        set_mood(&mut state, today, Mood::Bad);

        let profile = build_profile(form(), today);
        complete_onboarding(&mut state, profile, fallback_plan(), today);

        assert!(state.has_onboarded);
        assert_eq!(state.user_xp, 0);
        assert_eq!(state.user_level, 1);
        assert_eq!(state.streak_days, 1);
        assert!(state.mood_history.is_empty());
        assert_eq!(state.daily_schedule.len(), 7);
        assert_eq!(state.water_intake_goal, 2500);
    }

    #[test]
    fn test_due_tasks() {
        let mut state = AppState::new(date(2024, 1, 1));
        state.daily_schedule = vec![
            task("a", "07:00", TaskType::Meal, 30),
            task("b", "07:00", TaskType::Habit, 10),
            task("c", "09:00", TaskType::Work, 20),
        ];
        state.daily_schedule[1].completed = true;

        let due = due_tasks(&state, "07:00");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "a");
        assert!(due_tasks(&state, "08:00").is_empty());
    }

    #[test]
    fn test_visible_schedule_hides_work_on_days_off() {
        let mut state = onboarded_state();
        state.daily_schedule.push(task("commute", "08:15", TaskType::Commute, 0));
        state.profile.as_mut().unwrap().work_days = Some(vec![1, 2, 3, 4, 5]);

        let monday = visible_schedule(&state, Weekday::Mon);
        assert!(monday.iter().any(|t| t.kind == TaskType::Work));
        assert!(monday.iter().any(|t| t.kind == TaskType::Commute));
        assert!(monday.windows(2).all(|w| w[0].time <= w[1].time));

        let sunday = visible_schedule(&state, Weekday::Sun);
        assert!(sunday.iter().all(|t| !t.kind.is_work_related()));
        assert_eq!(sunday.len(), monday.len() - 3);
    }

    #[test]
    fn test_visible_schedule_without_work_days_shows_everything() {
        let state = onboarded_state();
        assert_eq!(
            visible_schedule(&state, Weekday::Sat).len(),
            state.daily_schedule.len()
        );
    }

    #[test]
    fn test_average_recipe_calories() {
        let state = onboarded_state();
        assert_eq!(average_recipe_calories(&state.recipes), 375);
        assert_eq!(average_recipe_calories(&[]), 0);
    }
}
