use anyhow::{Result, bail};
use clap::Args;

use resetliving_core::models::{ActivityLevel, Gender, OnboardingForm, normalize_clock_time};
use resetliving_core::progression::{build_profile, healthy_weight_range};
use resetliving_core::service::WellnessService;

use crate::gemini::Planner;

use super::helpers::{parse_work_days, print_task_table, today};

#[derive(Args)]
pub(crate) struct OnboardArgs {
    /// Your name
    #[arg(long)]
    name: String,
    /// Age in years
    #[arg(long)]
    age: u32,
    /// Current weight in kg
    #[arg(long)]
    weight: f64,
    /// Height in cm
    #[arg(long)]
    height: f64,
    /// Target weight in kg (default: current weight)
    #[arg(long)]
    target_weight: Option<f64>,
    /// Gender: male, female, other
    #[arg(long, default_value = "other")]
    gender: String,
    /// Wake-up time (HH:MM)
    #[arg(long, default_value = "07:00")]
    wake_up: String,
    /// Bed time (HH:MM)
    #[arg(long, default_value = "23:00")]
    bed_time: String,
    /// Work schedule, free text (e.g. "09:00 - 18:00")
    #[arg(long, default_value = "09:00 - 18:00")]
    work_schedule: String,
    /// Work days: 0-6 list (0 = Sunday), weekdays, weekends, all, or mon,tue,...
    #[arg(long)]
    work_days: Option<String>,
    /// Activity level: sedentary, light, moderate, active
    #[arg(long, default_value = "sedentary")]
    activity: String,
    /// What you want to achieve
    #[arg(long, default_value = "Ter mais energia e saúde")]
    goals: String,
    /// Dietary restrictions or allergies
    #[arg(long, default_value = "")]
    restrictions: String,
    /// Redo onboarding even if already done (keeps nothing)
    #[arg(long)]
    force: bool,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl OnboardArgs {
    fn into_form(self) -> Result<OnboardingForm> {
        let form = OnboardingForm {
            name: self.name.trim().to_string(),
            age: self.age,
            weight: self.weight,
            height: self.height,
            target_weight: self.target_weight,
            gender: Gender::parse(&self.gender)?,
            wake_up_time: normalize_clock_time(&self.wake_up)?,
            bed_time: normalize_clock_time(&self.bed_time)?,
            work_schedule: self.work_schedule,
            work_days: self.work_days.as_deref().map(parse_work_days).transpose()?,
            activity_level: ActivityLevel::parse(&self.activity)?,
            goals: self.goals,
            dietary_restrictions: self.restrictions.trim().to_string(),
        };
        form.validate()?;
        Ok(form)
    }
}

pub(crate) async fn cmd_onboard(
    svc: &WellnessService,
    planner: &Planner,
    args: OnboardArgs,
) -> Result<()> {
    let today = today();
    if !args.force && svc.state(today)?.has_onboarded {
        bail!("Already onboarded. Use --force to start over");
    }
    let json = args.json;
    let form = args.into_form()?;

    if !json {
        eprintln!("Creating your personalized plan...");
    }
    let profile = build_profile(form.clone(), today);
    let plan = planner.generate_plan(&profile).await;
    let state = svc.onboard(form, plan, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let (low, high) = healthy_weight_range(profile.height);
    println!("Welcome, {}!", profile.name);
    println!(
        "  BMI: {:.1} ({})  Healthy range: {low:.1} - {high:.1} kg",
        profile.bmi,
        profile.bmi_category.label()
    );
    println!("  Water goal: {} ml", state.water_intake_goal);
    println!("  {} recipes ready for meal prep\n", state.recipes.len());
    print_task_table(&state.daily_schedule);
    Ok(())
}
