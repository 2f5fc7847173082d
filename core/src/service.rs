use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::db::Database;
use crate::export;
use crate::models::{
    AppState, GeneratedPlan, Mood, OnboardingForm, Profile, Recipe, Task, validate_weight,
};
use crate::progression::{self, Award, LevelProgress};

const NOTIFICATIONS_SETTING: &str = "notifications";

/// Everything the home screen shows for one day.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub name: String,
    pub xp: u32,
    pub level: LevelProgress,
    pub streak_days: u32,
    pub water_intake_current: u32,
    pub water_intake_goal: u32,
    pub mood: Option<Mood>,
    pub completed_tasks: usize,
    /// Visible tasks for the weekday, ordered by time
    pub tasks: Vec<Task>,
}

/// Owns the store and applies one transition per call: load, roll the day
/// over if needed, transition, save.
pub struct WellnessService {
    db: Database,
}

impl WellnessService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    fn transition<T>(
        &self,
        today: NaiveDate,
        f: impl FnOnce(&mut AppState) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.db.load_state(today)?;
        progression::roll_over_day(&mut state, today);
        let out = f(&mut state)?;
        self.db.save_state(&state)?;
        Ok(out)
    }

    /// Current state, after the day rollover check.
    pub fn state(&self, today: NaiveDate) -> Result<AppState> {
        let mut state = self.db.load_state(today)?;
        if progression::roll_over_day(&mut state, today) {
            self.db.save_state(&state)?;
        }
        Ok(state)
    }

    pub fn profile(&self, today: NaiveDate) -> Result<Profile> {
        self.state(today)?
            .profile
            .context("Complete onboarding first (resetliving onboard)")
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<Dashboard> {
        let state = self.state(today)?;
        let name = Self::require_profile(&state)?.name.clone();
        let tasks: Vec<Task> = progression::visible_schedule(&state, today.weekday())
            .into_iter()
            .cloned()
            .collect();
        Ok(Dashboard {
            date: today,
            name,
            xp: state.user_xp,
            level: progression::level_progress(state.user_xp),
            streak_days: state.streak_days,
            water_intake_current: state.water_intake_current,
            water_intake_goal: state.water_intake_goal,
            mood: state.mood_on(today),
            completed_tasks: tasks.iter().filter(|t| t.completed).count(),
            tasks,
        })
    }

    /// Incomplete tasks scheduled at `now_hhmm`. Empty before onboarding.
    pub fn due_tasks(&self, today: NaiveDate, now_hhmm: &str) -> Result<Vec<Task>> {
        let state = self.state(today)?;
        if !state.has_onboarded {
            return Ok(Vec::new());
        }
        Ok(progression::due_tasks(&state, now_hhmm)
            .into_iter()
            .cloned()
            .collect())
    }

    fn require_profile(state: &AppState) -> Result<&Profile> {
        state
            .profile
            .as_ref()
            .filter(|_| state.has_onboarded)
            .context("Complete onboarding first (resetliving onboard)")
    }

    pub fn onboard(
        &self,
        form: OnboardingForm,
        plan: GeneratedPlan,
        today: NaiveDate,
    ) -> Result<AppState> {
        form.validate()?;
        let profile = progression::build_profile(form, today);
        self.transition(today, |state| {
            progression::complete_onboarding(state, profile, plan, today);
            log::debug!("onboarding complete with {} tasks", state.daily_schedule.len());
            Ok(state.clone())
        })
    }

    /// Complete a task by id. Completing a finished task succeeds with an
    /// empty award.
    pub fn complete_task(&self, task_id: &str, today: NaiveDate) -> Result<(Task, Award)> {
        self.transition(today, |state| {
            Self::require_profile(state)?;
            if state.task(task_id).is_none() {
                bail!("No task with id '{task_id}'");
            }
            let award = progression::complete_task(state, task_id);
            let task = state
                .task(task_id)
                .cloned()
                .context("Task disappeared after completion")?;
            Ok((task, award))
        })
    }

    pub fn add_water(&self, amount_ml: u32, today: NaiveDate) -> Result<(AppState, Award)> {
        if amount_ml == 0 {
            bail!("Water amount must be greater than 0");
        }
        self.transition(today, |state| {
            Self::require_profile(state)?;
            let award = progression::add_water(state, amount_ml);
            Ok((state.clone(), award))
        })
    }

    pub fn set_mood(&self, mood: Mood, date: NaiveDate, today: NaiveDate) -> Result<()> {
        self.transition(today, |state| {
            Self::require_profile(state)?;
            progression::set_mood(state, date, mood);
            Ok(())
        })
    }

    pub fn record_weight(&self, weight_kg: f64, date: NaiveDate, today: NaiveDate) -> Result<Profile> {
        validate_weight(weight_kg)?;
        self.transition(today, |state| {
            Self::require_profile(state)?;
            progression::record_weight(state, date, weight_kg);
            Self::require_profile(state).cloned()
        })
    }

    pub fn apply_plan(&self, plan: GeneratedPlan, today: NaiveDate) -> Result<AppState> {
        self.transition(today, |state| {
            Self::require_profile(state)?;
            progression::apply_generated_plan(state, plan);
            Ok(state.clone())
        })
    }

    /// Replace recipes with fresh suggestions. Returns `false` when the
    /// suggestion list was empty and nothing changed.
    pub fn apply_recipes(&self, recipes: Vec<Recipe>, today: NaiveDate) -> Result<bool> {
        self.transition(today, |state| {
            Self::require_profile(state)?;
            Ok(progression::apply_recipe_suggestions(state, recipes))
        })
    }

    pub fn export_json(&self, today: NaiveDate) -> Result<String> {
        export::export_state(&self.state(today)?)
    }

    pub fn export_history_csv<W: std::io::Write>(&self, writer: W, today: NaiveDate) -> Result<usize> {
        export::write_history_csv(&self.state(today)?, writer)
    }

    pub fn import_json(&self, json: &str) -> Result<AppState> {
        let state = export::import_state(json)?;
        self.db.save_state(&state)?;
        Ok(state)
    }

    pub fn reset(&self) -> Result<()> {
        self.db.clear()
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        let value = if enabled { "granted" } else { "denied" };
        self.db.set_setting(NOTIFICATIONS_SETTING, value)
    }

    pub fn notifications_enabled(&self) -> Result<bool> {
        Ok(self.db.get_setting(NOTIFICATIONS_SETTING)?.as_deref() == Some("granted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityLevel, Gender};
    use crate::plan::fallback_plan;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn form() -> OnboardingForm {
        OnboardingForm {
            name: "Dani".to_string(),
            age: 35,
            weight: 88.0,
            height: 180.0,
            target_weight: Some(78.0),
            gender: Gender::Other,
            wake_up_time: "06:00".to_string(),
            bed_time: "22:00".to_string(),
            work_schedule: "09:00 - 18:00".to_string(),
            work_days: None,
            activity_level: ActivityLevel::Light,
            goals: "Mais energia".to_string(),
            dietary_restrictions: "Vegetariano".to_string(),
        }
    }

    fn onboarded() -> WellnessService {
        let svc = WellnessService::new_in_memory().unwrap();
        svc.onboard(form(), fallback_plan(), date(1)).unwrap();
        svc
    }

    #[test]
    fn test_actions_require_onboarding() {
        let svc = WellnessService::new_in_memory().unwrap();
        assert!(svc.add_water(250, date(1)).is_err());
        assert!(svc.complete_task("1", date(1)).is_err());
        assert!(svc.record_weight(80.0, date(1), date(1)).is_err());
        assert!(svc.profile(date(1)).is_err());
    }

    #[test]
    fn test_onboard_persists_profile_and_plan() {
        let svc = onboarded();
        let state = svc.state(date(1)).unwrap();
        assert!(state.has_onboarded);
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.daily_schedule.len(), 7);
        let profile = svc.profile(date(1)).unwrap();
        assert_eq!(profile.bmi_category.label(), "Sobrepeso");
    }

    #[test]
    fn test_onboard_rejects_invalid_form() {
        let svc = WellnessService::new_in_memory().unwrap();
        let mut bad = form();
        bad.weight = 10.0;
        assert!(svc.onboard(bad, fallback_plan(), date(1)).is_err());
        assert!(!svc.state(date(1)).unwrap().has_onboarded);
    }

    #[test]
    fn test_complete_task_persists_xp() {
        let svc = onboarded();
        let (task, award) = svc.complete_task("7", date(1)).unwrap();
        assert!(task.completed);
        assert_eq!(award.xp_gained, 50);

        let (_, again) = svc.complete_task("7", date(1)).unwrap();
        assert_eq!(again.xp_gained, 0);
        assert_eq!(svc.state(date(1)).unwrap().user_xp, 50);
        assert!(svc.complete_task("nope", date(1)).is_err());
    }

    #[test]
    fn test_state_rolls_over_on_new_day() {
        let svc = onboarded();
        svc.complete_task("1", date(1)).unwrap();
        svc.add_water(500, date(1)).unwrap();

        let state = svc.state(date(2)).unwrap();
        assert_eq!(state.streak_days, 2);
        assert_eq!(state.water_intake_current, 0);
        assert!(state.daily_schedule.iter().all(|t| !t.completed));
        assert_eq!(state.user_xp, 30 + 20);

        // Reading again the same day does not roll over twice
        assert_eq!(svc.state(date(2)).unwrap().streak_days, 2);
    }

    #[test]
    fn test_action_on_new_day_rolls_over_first() {
        let svc = onboarded();
        svc.complete_task("1", date(1)).unwrap();
        let (task, award) = svc.complete_task("1", date(2)).unwrap();
        assert!(task.completed);
        assert_eq!(award.xp_gained, 30);
    }

    #[test]
    fn test_water_goal_bonus_through_service() {
        let svc = onboarded();
        for _ in 0..9 {
            svc.add_water(250, date(1)).unwrap();
        }
        let (state, award) = svc.add_water(250, date(1)).unwrap();
        assert_eq!(state.water_intake_current, 2500);
        assert!(award.water_goal_reached());
        assert_eq!(state.user_xp, 10 * 10 + 50);
    }

    #[test]
    fn test_record_weight_and_mood() {
        let svc = onboarded();
        let profile = svc.record_weight(86.0, date(1), date(1)).unwrap();
        assert_eq!(profile.weight_history.len(), 1);
        assert!((profile.weight - 86.0).abs() < f64::EPSILON);
        assert!(svc.record_weight(500.0, date(1), date(1)).is_err());

        svc.set_mood(Mood::Ok, date(1), date(1)).unwrap();
        svc.set_mood(Mood::Great, date(1), date(1)).unwrap();
        let state = svc.state(date(1)).unwrap();
        assert_eq!(state.mood_history.len(), 1);
        assert_eq!(state.mood_on(date(1)), Some(Mood::Great));
    }

    #[test]
    fn test_apply_plan_and_recipes() {
        let svc = onboarded();
        svc.complete_task("5", date(1)).unwrap();
        let mut plan = fallback_plan();
        plan.water_goal = 3200;
        plan.tasks.truncate(2);
        let state = svc.apply_plan(plan, date(1)).unwrap();
        assert_eq!(state.daily_schedule.len(), 2);
        assert_eq!(state.water_intake_goal, 3200);
        assert_eq!(state.user_xp, 40);

        assert!(!svc.apply_recipes(vec![], date(1)).unwrap());
        let recipes = fallback_plan().recipes[..1].to_vec();
        assert!(svc.apply_recipes(recipes, date(1)).unwrap());
        assert_eq!(svc.state(date(1)).unwrap().recipes.len(), 1);
    }

    #[test]
    fn test_export_import_and_reset() {
        let svc = onboarded();
        svc.complete_task("1", date(1)).unwrap();
        let json = svc.export_json(date(1)).unwrap();

        svc.reset().unwrap();
        assert!(!svc.state(date(1)).unwrap().has_onboarded);

        let restored = svc.import_json(&json).unwrap();
        assert_eq!(restored.user_xp, 30);
        assert!(svc.state(date(1)).unwrap().has_onboarded);
    }

    #[test]
    fn test_export_history_csv() {
        let svc = onboarded();
        svc.set_mood(Mood::Good, date(1), date(1)).unwrap();
        let mut buf = Vec::new();
        assert_eq!(svc.export_history_csv(&mut buf, date(1)).unwrap(), 2);
    }

    #[test]
    fn test_notification_setting() {
        let svc = WellnessService::new_in_memory().unwrap();
        assert!(!svc.notifications_enabled().unwrap());
        svc.set_notifications_enabled(true).unwrap();
        assert!(svc.notifications_enabled().unwrap());
        svc.set_notifications_enabled(false).unwrap();
        assert!(!svc.notifications_enabled().unwrap());
    }

    #[test]
    fn test_dashboard_hides_work_on_days_off() {
        let svc = WellnessService::new_in_memory().unwrap();
        let mut f = form();
        f.work_days = Some(vec![1, 2, 3, 4, 5]);
        svc.onboard(f, fallback_plan(), date(1)).unwrap();

        // 2024-04-01 is a Monday, 2024-04-06 a Saturday
        let monday = svc.dashboard(date(1)).unwrap();
        assert_eq!(monday.tasks.len(), 7);
        assert_eq!(monday.name, "Dani");
        assert_eq!(monday.level.level, 1);

        let saturday = svc.dashboard(date(6)).unwrap();
        assert_eq!(saturday.tasks.len(), 5);
        assert!(saturday.tasks.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_dashboard_counts_completed_and_mood() {
        let svc = onboarded();
        svc.complete_task("1", date(1)).unwrap();
        svc.set_mood(Mood::Tired, date(1), date(1)).unwrap();
        let dash = svc.dashboard(date(1)).unwrap();
        assert_eq!(dash.completed_tasks, 1);
        assert_eq!(dash.mood, Some(Mood::Tired));
        assert_eq!(dash.xp, 30);
    }

    #[test]
    fn test_due_tasks() {
        let svc = WellnessService::new_in_memory().unwrap();
        assert!(svc.due_tasks(date(1), "07:00").unwrap().is_empty());

        let svc = onboarded();
        let due = svc.due_tasks(date(1), "07:00").unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].title, "Café da Manhã");
        svc.complete_task("1", date(1)).unwrap();
        assert!(svc.due_tasks(date(1), "07:00").unwrap().is_empty());
    }
}
