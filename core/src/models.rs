use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const XP_PER_LEVEL: u32 = 1000;
pub const DEFAULT_WATER_GOAL_ML: u32 = 2500;
pub const GLASS_ML: u32 = 250;
pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MAX_WEIGHT_KG: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Masculino")]
    Male,
    #[serde(rename = "Feminino")]
    Female,
    #[serde(rename = "Outro")]
    Other,
}

impl Gender {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Masculino",
            Self::Female => "Feminino",
            Self::Other => "Outro",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "male" | "m" | "masculino" => Ok(Self::Male),
            "female" | "f" | "feminino" => Ok(Self::Female),
            "other" | "outro" => Ok(Self::Other),
            _ => bail!("Invalid gender '{s}'. Use male, female or other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    #[serde(rename = "Sedentário")]
    Sedentary,
    #[serde(rename = "Levemente Ativo")]
    Light,
    #[serde(rename = "Moderado")]
    Moderate,
    #[serde(rename = "Muito Ativo")]
    Active,
}

impl ActivityLevel {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sedentary => "Sedentário",
            Self::Light => "Levemente Ativo",
            Self::Moderate => "Moderado",
            Self::Active => "Muito Ativo",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sedentary" | "sedentário" | "sedentario" => Ok(Self::Sedentary),
            "light" | "lightly-active" | "levemente ativo" => Ok(Self::Light),
            "moderate" | "moderado" => Ok(Self::Moderate),
            "active" | "very-active" | "muito ativo" => Ok(Self::Active),
            _ => bail!("Invalid activity level '{s}'. Use sedentary, light, moderate or active"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Meal,
    Water,
    Exercise,
    WorkoutApp,
    Sleep,
    Habit,
    Work,
    Commute,
}

impl TaskType {
    pub const ALL: [Self; 8] = [
        Self::Meal,
        Self::Water,
        Self::Exercise,
        Self::WorkoutApp,
        Self::Sleep,
        Self::Habit,
        Self::Work,
        Self::Commute,
    ];

    /// Wire name used in persisted state and the plan-generation schema.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meal => "MEAL",
            Self::Water => "WATER",
            Self::Exercise => "EXERCISE",
            Self::WorkoutApp => "WORKOUT_APP",
            Self::Sleep => "SLEEP",
            Self::Habit => "HABIT",
            Self::Work => "WORK",
            Self::Commute => "COMMUTE",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Meal => "🍽",
            Self::Water => "💧",
            Self::Exercise => "🔥",
            Self::WorkoutApp => "📱",
            Self::Sleep => "🌙",
            Self::Habit => "✔",
            Self::Work => "💼",
            Self::Commute => "🚗",
        }
    }

    /// Badge shown instead of the XP reward for tasks tracked elsewhere.
    #[must_use]
    pub fn badge(self) -> Option<&'static str> {
        match self {
            Self::WorkoutApp => Some("EXTERNAL APP"),
            Self::Work => Some("WORK"),
            Self::Commute => Some("COMMUTE"),
            Self::Meal | Self::Water | Self::Exercise | Self::Sleep | Self::Habit => None,
        }
    }

    /// Work-only tasks are hidden on days off.
    #[must_use]
    pub fn is_work_related(self) -> bool {
        matches!(self, Self::Work | Self::Commute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mood {
    Great,
    Good,
    Ok,
    Tired,
    Bad,
}

impl Mood {
    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Great => "😄",
            Self::Good => "🙂",
            Self::Ok => "😐",
            Self::Tired => "😫",
            Self::Bad => "😞",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Good => "good",
            Self::Ok => "ok",
            Self::Tired => "tired",
            Self::Bad => "bad",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "great" => Ok(Self::Great),
            "good" => Ok(Self::Good),
            "ok" => Ok(Self::Ok),
            "tired" => Ok(Self::Tired),
            "bad" => Ok(Self::Bad),
            _ => bail!("Invalid mood '{s}'. Use great, good, ok, tired or bad"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    #[serde(rename = "Abaixo do Peso")]
    Underweight,
    #[serde(rename = "Peso Normal")]
    Normal,
    #[serde(rename = "Sobrepeso")]
    Overweight,
    #[serde(rename = "Obesidade")]
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 24.9 {
            Self::Normal
        } else if bmi < 29.9 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Abaixo do Peso",
            Self::Normal => "Peso Normal",
            Self::Overweight => "Sobrepeso",
            Self::Obese => "Obesidade",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub mood: Mood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub age: u32,
    /// Current weight in kg
    pub weight: f64,
    /// Missing in older blobs; filled from `weight` on import
    #[serde(default)]
    pub start_weight: f64,
    #[serde(default)]
    pub target_weight: f64,
    #[serde(default)]
    pub weight_history: Vec<WeightEntry>,
    /// Height in cm
    pub height: f64,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    pub gender: Gender,
    pub wake_up_time: String,
    pub bed_time: String,
    pub work_schedule: String,
    /// 0 = Sunday .. 6 = Saturday. `None` means every day is a work day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_days: Option<Vec<u8>>,
    pub activity_level: ActivityLevel,
    pub goals: String,
    #[serde(default)]
    pub dietary_restrictions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// `HH:MM`
    pub time: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
    pub completed: bool,
    #[serde(deserialize_with = "lenient_count")]
    pub xp_reward: u32,
    #[serde(
        default,
        deserialize_with = "lenient_count_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub calories: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub prep_time: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub prep_time_minutes: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub calories: u32,
    pub is_meal_prep_friendly: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub has_onboarded: bool,
    pub profile: Option<Profile>,
    pub daily_schedule: Vec<Task>,
    pub recipes: Vec<Recipe>,
    #[serde(rename = "userXP")]
    pub user_xp: u32,
    pub user_level: u32,
    pub streak_days: u32,
    pub last_login_date: NaiveDate,
    pub water_intake_current: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub water_intake_goal: u32,
    #[serde(default)]
    pub mood_history: Vec<MoodEntry>,
}

impl AppState {
    /// Fresh state for a user who has not onboarded yet.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            has_onboarded: false,
            profile: None,
            daily_schedule: Vec::new(),
            recipes: Vec::new(),
            user_xp: 0,
            user_level: 1,
            streak_days: 0,
            last_login_date: today,
            water_intake_current: 0,
            water_intake_goal: DEFAULT_WATER_GOAL_ML,
            mood_history: Vec::new(),
        }
    }

    #[must_use]
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.daily_schedule.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn mood_on(&self, date: NaiveDate) -> Option<Mood> {
        self.mood_history
            .iter()
            .find(|m| m.date == date)
            .map(|m| m.mood)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPlan {
    pub tasks: Vec<Task>,
    pub recipes: Vec<Recipe>,
    pub water_goal: u32,
}

/// Questionnaire answers collected before onboarding completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingForm {
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub height: f64,
    #[serde(default)]
    pub target_weight: Option<f64>,
    pub gender: Gender,
    pub wake_up_time: String,
    pub bed_time: String,
    pub work_schedule: String,
    #[serde(default)]
    pub work_days: Option<Vec<u8>>,
    pub activity_level: ActivityLevel,
    pub goals: String,
    #[serde(default)]
    pub dietary_restrictions: String,
}

impl OnboardingForm {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Name cannot be empty");
        }
        if self.age == 0 {
            bail!("Age must be greater than 0");
        }
        validate_weight(self.weight)?;
        if let Some(target) = self.target_weight {
            validate_weight(target)?;
        }
        if self.height <= 0.0 {
            bail!("Height must be greater than 0");
        }
        validate_clock_time(&self.wake_up_time)?;
        validate_clock_time(&self.bed_time)?;
        if let Some(days) = &self.work_days {
            validate_work_days(days)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeFilter {
    All,
    Fast,
    Complex,
}

impl RecipeFilter {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "fast" => Ok(Self::Fast),
            "complex" => Ok(Self::Complex),
            _ => bail!("Invalid recipe filter '{s}'. Use all, fast or complex"),
        }
    }

    #[must_use]
    pub fn matches(self, recipe: &Recipe) -> bool {
        match self {
            Self::All => true,
            Self::Fast => recipe.prep_time_minutes <= 30,
            Self::Complex => recipe.prep_time_minutes > 30,
        }
    }
}

pub fn validate_weight(weight_kg: f64) -> Result<()> {
    if !(weight_kg > MIN_WEIGHT_KG && weight_kg < MAX_WEIGHT_KG) {
        bail!("Weight must be between {MIN_WEIGHT_KG:.0} and {MAX_WEIGHT_KG:.0} kg");
    }
    Ok(())
}

/// Normalize a clock time to `HH:MM`, accepting `7:05` as well as `07:05`.
pub fn normalize_clock_time(s: &str) -> Result<String> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| anyhow::anyhow!("Invalid time '{s}'. Use HH:MM"))?;
    Ok(t.format("%H:%M").to_string())
}

pub fn validate_clock_time(s: &str) -> Result<()> {
    normalize_clock_time(s).map(|_| ())
}

/// Round a JSON number to a non-negative count. Negative and non-finite
/// values become 0.
#[allow(clippy::cast_sign_loss)]
pub(crate) fn round_count(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.round() as u32
    } else {
        0
    }
}

// Stored blobs carry generator numbers verbatim, so `412.5` can appear where
// a count is expected.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(round_count)
}

fn lenient_count_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(|v| v.map(round_count))
}

pub fn validate_work_days(days: &[u8]) -> Result<()> {
    if let Some(d) = days.iter().find(|d| **d > 6) {
        bail!("Invalid work day {d}. Use 0 (Sunday) to 6 (Saturday)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi_category_thresholds() {
        assert_eq!(BmiCategory::from_bmi(18.4), BmiCategory::Underweight);
        assert_eq!(BmiCategory::from_bmi(18.5), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(24.8), BmiCategory::Normal);
        assert_eq!(BmiCategory::from_bmi(24.9), BmiCategory::Overweight);
        assert_eq!(BmiCategory::from_bmi(29.9), BmiCategory::Obese);
        assert_eq!(BmiCategory::from_bmi(27.2).label(), "Sobrepeso");
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskType::WorkoutApp).unwrap(),
            "\"WORKOUT_APP\""
        );
        assert_eq!(serde_json::to_string(&Mood::Tired).unwrap(), "\"TIRED\"");
        assert_eq!(
            serde_json::to_string(&ActivityLevel::Sedentary).unwrap(),
            "\"Sedentário\""
        );
        assert_eq!(
            serde_json::to_string(&BmiCategory::Normal).unwrap(),
            "\"Peso Normal\""
        );
        for kind in TaskType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_app_state_camel_case_keys() {
        let state = AppState::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["hasOnboarded"], false);
        assert_eq!(json["userXP"], 0);
        assert_eq!(json["userLevel"], 1);
        assert_eq!(json["lastLoginDate"], "2024-01-01");
        assert_eq!(json["waterIntakeGoal"], 2500);
        assert!(json["dailySchedule"].is_array());
    }

    #[test]
    fn test_task_type_field_named_type() {
        let json = r#"{"id":"1","time":"07:00","title":"Café","description":"Ovos",
            "type":"MEAL","completed":false,"xpReward":30,"calories":350}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.kind, TaskType::Meal);
        assert_eq!(task.calories, Some(350));
    }

    #[test]
    fn test_mood_parse() {
        assert_eq!(Mood::parse("GREAT").unwrap(), Mood::Great);
        assert_eq!(Mood::parse("tired").unwrap(), Mood::Tired);
        assert!(Mood::parse("sleepy").is_err());
    }

    #[test]
    fn test_gender_and_activity_parse() {
        assert_eq!(Gender::parse("F").unwrap(), Gender::Female);
        assert_eq!(
            ActivityLevel::parse("moderate").unwrap(),
            ActivityLevel::Moderate
        );
        assert!(ActivityLevel::parse("couch").is_err());
    }

    #[test]
    fn test_validate_weight_bounds() {
        assert!(validate_weight(80.0).is_ok());
        assert!(validate_weight(30.0).is_err());
        assert!(validate_weight(300.0).is_err());
        assert!(validate_weight(f64::NAN).is_err());
    }

    #[test]
    fn test_normalize_clock_time() {
        assert_eq!(normalize_clock_time("7:05").unwrap(), "07:05");
        assert_eq!(normalize_clock_time("23:59").unwrap(), "23:59");
        assert!(normalize_clock_time("24:00").is_err());
        assert!(normalize_clock_time("noon").is_err());
    }

    #[test]
    fn test_recipe_filter() {
        let mut recipe = Recipe {
            id: "r1".to_string(),
            name: "Escondidinho".to_string(),
            description: String::new(),
            ingredients: vec![],
            prep_time: "30 min".to_string(),
            prep_time_minutes: 30,
            calories: 400,
            is_meal_prep_friendly: true,
        };
        assert!(RecipeFilter::Fast.matches(&recipe));
        assert!(!RecipeFilter::Complex.matches(&recipe));
        recipe.prep_time_minutes = 31;
        assert!(RecipeFilter::Complex.matches(&recipe));
        assert!(RecipeFilter::All.matches(&recipe));
    }

    #[test]
    fn test_onboarding_form_validate() {
        let mut form = OnboardingForm {
            name: "Ana".to_string(),
            age: 30,
            weight: 80.0,
            height: 165.0,
            target_weight: Some(68.0),
            gender: Gender::Female,
            wake_up_time: "07:00".to_string(),
            bed_time: "23:00".to_string(),
            work_schedule: "09:00 - 18:00".to_string(),
            work_days: Some(vec![1, 2, 3, 4, 5]),
            activity_level: ActivityLevel::Sedentary,
            goals: "Emagrecer".to_string(),
            dietary_restrictions: String::new(),
        };
        assert!(form.validate().is_ok());

        form.name = "  ".to_string();
        assert!(form.validate().is_err());
        form.name = "Ana".to_string();

        form.work_days = Some(vec![7]);
        assert!(form.validate().is_err());
        form.work_days = None;

        form.bed_time = "25:00".to_string();
        assert!(form.validate().is_err());
    }
}
