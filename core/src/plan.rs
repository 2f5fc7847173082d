use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{
    DEFAULT_WATER_GOAL_ML, GeneratedPlan, Profile, Recipe, Task, TaskType, round_count,
};

/// Plan as returned by the generator, before ids are assigned.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    #[serde(default)]
    pub water_goal: Option<f64>,
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
    #[serde(default)]
    pub recipes: Vec<RecipeDraft>,
}

#[derive(Debug, Deserialize)]
pub struct RecipesResponse {
    #[serde(default)]
    pub recipes: Vec<RecipeDraft>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub time: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
    #[serde(default)]
    pub xp_reward: f64,
    #[serde(default)]
    pub calories: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub prep_time_minutes: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub is_meal_prep_friendly: bool,
}


impl TaskDraft {
    #[must_use]
    pub fn into_task(self, id: String) -> Task {
        let time = crate::models::normalize_clock_time(&self.time).unwrap_or(self.time);
        Task {
            id,
            time,
            title: self.title,
            description: self.description,
            kind: self.kind,
            completed: false,
            xp_reward: round_count(self.xp_reward),
            calories: self.calories.map(round_count).filter(|c| *c > 0),
        }
    }
}

impl RecipeDraft {
    #[must_use]
    pub fn into_recipe(self, id: String) -> Recipe {
        Recipe {
            id,
            name: self.name,
            description: self.description,
            ingredients: self.ingredients,
            prep_time: self.prep_time,
            prep_time_minutes: round_count(self.prep_time_minutes),
            calories: round_count(self.calories),
            is_meal_prep_friendly: self.is_meal_prep_friendly,
        }
    }
}

/// Remove a surrounding Markdown code fence, if the generator added one.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let body = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a full plan response, assigning `task-{stamp}-{i}` and
/// `recipe-{stamp}-{i}` ids.
pub fn parse_plan_response(text: &str, stamp: i64) -> Result<GeneratedPlan> {
    let data: PlanResponse =
        serde_json::from_str(strip_code_fence(text)).context("Failed to parse plan response")?;

    let tasks = data
        .tasks
        .into_iter()
        .enumerate()
        .map(|(i, t)| t.into_task(format!("task-{stamp}-{i}")))
        .collect();
    let recipes = data
        .recipes
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.into_recipe(format!("recipe-{stamp}-{i}")))
        .collect();
    let water_goal = data
        .water_goal
        .map(round_count)
        .filter(|g| *g > 0)
        .unwrap_or(DEFAULT_WATER_GOAL_ML);

    Ok(GeneratedPlan {
        tasks,
        recipes,
        water_goal,
    })
}

/// Parse a recipe-only response, assigning `new-recipe-{stamp}-{i}` ids.
pub fn parse_recipes_response(text: &str, stamp: i64) -> Result<Vec<Recipe>> {
    let data: RecipesResponse = serde_json::from_str(strip_code_fence(text))
        .context("Failed to parse recipe response")?;
    Ok(data
        .recipes
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.into_recipe(format!("new-recipe-{stamp}-{i}")))
        .collect())
}

fn restrictions_or(profile: &Profile, none: &'static str) -> String {
    let r = profile.dietary_restrictions.trim();
    if r.is_empty() { none.to_string() } else { r.to_string() }
}

/// Prompt for a full daily plan: routine, meal-prep recipes and water goal.
#[must_use]
pub fn plan_prompt(profile: &Profile) -> String {
    let restrictions = restrictions_or(profile, "Nenhuma");
    format!(
        "Atue como um nutricionista e personal trainer de elite. Crie um plano diário para:
Nome: {name}
Dados: {age} anos, {weight}kg, {height}cm, Gênero: {gender}.
IMC Atual: {bmi} ({category}).
META DE PESO DO USUÁRIO: {target}kg.
RESTRIÇÕES ALIMENTARES: {restrictions} (LEVE ISSO MUITO A SÉRIO).

Rotina: Acorda às {wake}, Dorme às {bed}, Trab: {work}
Nível: {level}
Objetivo Descritivo: {goals}

REQUISITOS OBRIGATÓRIOS:
1. Rotina (tasks): Cronológica.
   - Para TODAS as tarefas do tipo \"MEAL\", o campo 'description' DEVE conter sugestões específicas do que comer, respeitando as restrições alimentares.
   - Incluir uma tarefa diária para tomar \"1 scoop de Creatina\".
   - Se o usuário definiu horário de trabalho ({work}), crie uma tarefa \"Iniciar Foco no Trabalho\" no início e \"Encerrar Expediente\" no final.
   - Inclua horários de água.
   - Inclua caminhadas leves se sedentário.
   - Inclua um lembrete: \"Abrir App de Treino\" em horário estratégico.
   - Para refeições (\"MEAL\"), estime as calorias no campo 'calories'.

2. Receitas (Marmitas):
   - Gere entre 5 a 7 receitas de refeições saudáveis (almoço/jantar) que possam ser congeladas (meal prep).
   - DEVEM RESPEITAR: {restrictions}.

3. Meta de água em ml.

Retorne JSON puro.",
        name = profile.name,
        age = profile.age,
        weight = profile.weight,
        height = profile.height,
        gender = profile.gender.label(),
        bmi = profile.bmi,
        category = profile.bmi_category.label(),
        target = profile.target_weight,
        wake = profile.wake_up_time,
        bed = profile.bed_time,
        work = profile.work_schedule,
        level = profile.activity_level.label(),
        goals = profile.goals,
    )
}

/// Prompt for six new meal-prep recipes, prioritising pantry ingredients
/// when given.
#[must_use]
pub fn recipes_prompt(profile: &Profile, ingredients: Option<&str>) -> String {
    let restrictions = restrictions_or(profile, "Nenhuma");
    let pantry = match ingredients.map(str::trim) {
        Some(items) if !items.is_empty() => format!(
            "O usuário tem estes ingredientes em casa: \"{items}\". PRIORIZE receitas que usem esses itens para evitar desperdício e economizar, mas pode adicionar itens básicos de despensa.\n"
        ),
        _ => String::new(),
    };
    format!(
        "Crie 6 NOVAS sugestões de receitas de marmitas saudáveis para:
Perfil: {name}, objetivo: {goals}.
Restrições Alimentares: {restrictions}.
{pantry}Foco: Praticidade, baixo custo e congelamento (Meal Prep).",
        name = profile.name,
        goals = profile.goals,
    )
}

fn fallback_task(
    id: &str,
    time: &str,
    title: &str,
    description: &str,
    kind: TaskType,
    xp_reward: u32,
    calories: Option<u32>,
) -> Task {
    Task {
        id: id.to_string(),
        time: time.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        kind,
        completed: false,
        xp_reward,
        calories,
    }
}

/// Offline plan used whenever the generator is unavailable.
#[must_use]
pub fn fallback_plan() -> GeneratedPlan {
    let tasks = vec![
        fallback_task(
            "1",
            "07:00",
            "Café da Manhã",
            "Ovos mexidos com espinafre e 1 fatia de pão integral.",
            TaskType::Meal,
            30,
            Some(350),
        ),
        fallback_task(
            "2",
            "07:15",
            "Suplementação",
            "Tomar 1 scoop de Creatina com água.",
            TaskType::Habit,
            10,
            None,
        ),
        fallback_task(
            "3",
            "09:00",
            "Iniciar Foco no Trabalho",
            "Organize suas tarefas e inicie o dia produtivo.",
            TaskType::Work,
            20,
            None,
        ),
        fallback_task(
            "4",
            "10:30",
            "Hidratação",
            "Beber 2 copos de água.",
            TaskType::Water,
            10,
            None,
        ),
        fallback_task(
            "5",
            "13:00",
            "Almoço",
            "Frango grelhado (150g), arroz integral (3 colheres) e salada verde.",
            TaskType::Meal,
            40,
            Some(500),
        ),
        fallback_task(
            "6",
            "18:00",
            "Encerrar Expediente",
            "Desconecte-se do trabalho. Hora de cuidar de você.",
            TaskType::Work,
            20,
            None,
        ),
        fallback_task(
            "7",
            "19:00",
            "Treino",
            "Abrir App de Treino e fazer exercícios do dia.",
            TaskType::WorkoutApp,
            50,
            None,
        ),
    ];

    let recipes = vec![
        Recipe {
            id: "r1".to_string(),
            name: "Escondidinho de Batata Doce".to_string(),
            description: "Camadas de purê de batata doce e carne moída magra.".to_string(),
            ingredients: ["Batata doce", "Patinho moído", "Cebola", "Alho"]
                .map(String::from)
                .to_vec(),
            prep_time: "40 min".to_string(),
            prep_time_minutes: 40,
            calories: 400,
            is_meal_prep_friendly: true,
        },
        Recipe {
            id: "r2".to_string(),
            name: "Frango com Legumes Assados".to_string(),
            description: "Cubos de peito de frango assados com brócolis e cenoura.".to_string(),
            ingredients: ["Peito de frango", "Brócolis", "Cenoura", "Azeite"]
                .map(String::from)
                .to_vec(),
            prep_time: "25 min".to_string(),
            prep_time_minutes: 25,
            calories: 350,
            is_meal_prep_friendly: true,
        },
    ];

    GeneratedPlan {
        tasks,
        recipes,
        water_goal: DEFAULT_WATER_GOAL_ML,
    }
}
