use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::Config;
use resetliving_core::models::{GeneratedPlan, Profile, Recipe, TaskType};
use resetliving_core::plan::{
    fallback_plan, parse_plan_response, parse_recipes_response, plan_prompt, recipes_prompt,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
    }
}

fn recipe_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "description": { "type": "STRING" },
            "ingredients": { "type": "ARRAY", "items": { "type": "STRING" } },
            "prepTime": { "type": "STRING" },
            "prepTimeMinutes": { "type": "NUMBER", "description": "Tempo em minutos (apenas numero)" },
            "calories": { "type": "NUMBER" },
            "isMealPrepFriendly": { "type": "BOOLEAN" }
        },
        "required": [
            "name", "description", "ingredients", "prepTime",
            "prepTimeMinutes", "calories", "isMealPrepFriendly"
        ]
    })
}

fn plan_schema() -> Value {
    let task_types: Vec<&str> = TaskType::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "waterGoal": { "type": "NUMBER", "description": "Meta diária de água em ML" },
            "tasks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "time": { "type": "STRING", "description": "Horário formato HH:mm" },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING", "description": "O que fazer ou O QUE COMER especificamente" },
                        "type": { "type": "STRING", "enum": task_types },
                        "xpReward": { "type": "NUMBER", "description": "XP ganho (10-50)" },
                        "calories": { "type": "NUMBER", "description": "Estimativa calórica se for refeição" }
                    },
                    "required": ["time", "title", "description", "type", "xpReward"]
                }
            },
            "recipes": { "type": "ARRAY", "items": recipe_schema() }
        },
        "required": ["waterGoal", "tasks", "recipes"]
    })
}

fn recipes_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "recipes": { "type": "ARRAY", "items": recipe_schema() }
        }
    })
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "resetliving/{} (routine planner)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(60))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    async fn generate(&self, prompt: String, schema: Value) -> Result<String> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach Gemini API")?
            .error_for_status()
            .context("Gemini API returned an error")?;

        let data: GenerateResponse = resp
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        data.into_text().context("No data returned from Gemini")
    }

    pub async fn generate_plan(&self, profile: &Profile) -> Result<GeneratedPlan> {
        let text = self.generate(plan_prompt(profile), plan_schema()).await?;
        parse_plan_response(&text, chrono::Utc::now().timestamp_millis())
    }

    pub async fn suggest_recipes(
        &self,
        profile: &Profile,
        ingredients: Option<&str>,
    ) -> Result<Vec<Recipe>> {
        let text = self
            .generate(recipes_prompt(profile, ingredients), recipes_schema())
            .await?;
        parse_recipes_response(&text, chrono::Utc::now().timestamp_millis())
    }
}

/// Plan source used by the commands and the server. Never fails: generator
/// errors are logged and replaced by the offline plan, or by no recipes.
pub enum Planner {
    Gemini(GeminiClient),
    Offline,
}

impl Planner {
    pub fn from_config(config: &Config) -> Self {
        let Some(key) = config.gemini_api_key.clone() else {
            return Self::Offline;
        };
        match GeminiClient::new(key, config.model.clone()) {
            Ok(client) => Self::Gemini(client),
            Err(e) => {
                log::warn!("Gemini client unavailable, using offline plan: {e:#}");
                Self::Offline
            }
        }
    }

    pub async fn generate_plan(&self, profile: &Profile) -> GeneratedPlan {
        let Self::Gemini(client) = self else {
            log::warn!("no GEMINI_API_KEY or API_KEY set, using the offline plan");
            return fallback_plan();
        };
        match client.generate_plan(profile).await {
            Ok(plan) => plan,
            Err(e) => {
                log::warn!("plan generation failed, using offline plan: {e:#}");
                fallback_plan()
            }
        }
    }

    pub async fn suggest_recipes(&self, profile: &Profile, ingredients: Option<&str>) -> Vec<Recipe> {
        let Self::Gemini(client) = self else {
            log::warn!("no GEMINI_API_KEY or API_KEY set, no new recipes");
            return Vec::new();
        };
        match client.suggest_recipes(profile, ingredients).await {
            Ok(recipes) => recipes,
            Err(e) => {
                log::warn!("recipe generation failed: {e:#}");
                Vec::new()
            }
        }
    }
}
