use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::limit::RequestBodyLimitLayer;

use crate::gemini::Planner;
use resetliving_core::calendar::{DEFAULT_FILE_NAME, build_calendar};
use resetliving_core::models::{
    AppState, GLASS_ML, Mood, OnboardingForm, Profile, RecipeFilter, normalize_clock_time,
    validate_weight,
};
use resetliving_core::progression::{average_recipe_calories, build_profile};
use resetliving_core::reminders::Reminder;
use resetliving_core::service::{Dashboard, WellnessService};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct ServerState {
    svc: Arc<Mutex<WellnessService>>,
    planner: Arc<Planner>,
    api_key: Option<String>,
}

impl ServerState {
    fn svc(&self) -> MutexGuard<'_, WellnessService> {
        self.svc.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// --- Request / Response types ---

fn default_glass() -> u32 {
    GLASS_ML
}

#[derive(Deserialize)]
struct WaterRequest {
    #[serde(default = "default_glass")]
    amount_ml: u32,
}

#[derive(Deserialize)]
struct MoodRequest {
    mood: String,
    date: Option<String>,
}

#[derive(Deserialize)]
struct WeightRequest {
    weight_kg: f64,
    date: Option<String>,
}

#[derive(Deserialize)]
struct RecipesQuery {
    filter: Option<String>,
}

#[derive(Deserialize)]
struct RegenerateRecipesRequest {
    #[serde(default)]
    ingredients: Option<String>,
}

#[derive(Deserialize)]
struct OnboardQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct RemindersQuery {
    time: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                log::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn parse_day(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    date.map_or_else(
        || Ok(today()),
        |d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| ApiError::BadRequest(format!("Invalid date '{d}'. Use YYYY-MM-DD")))
        },
    )
}

/// Current state, or 400 when onboarding has not happened yet.
fn onboarded_state(svc: &WellnessService) -> Result<AppState, ApiError> {
    let state = svc.state(today()).context("failed to load state")?;
    if state.has_onboarded && state.profile.is_some() {
        Ok(state)
    } else {
        Err(ApiError::BadRequest(
            "Complete onboarding first".to_string(),
        ))
    }
}

fn onboarded_profile(svc: &WellnessService) -> Result<Profile, ApiError> {
    onboarded_state(svc)?
        .profile
        .ok_or_else(|| ApiError::BadRequest("Complete onboarding first".to_string()))
}

// --- Middleware ---

async fn require_auth(State(state): State<ServerState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn get_state(State(state): State<ServerState>) -> Result<Json<AppState>, ApiError> {
    let app = state.svc().state(today()).context("failed to load state")?;
    Ok(Json(app))
}

async fn get_dashboard(State(state): State<ServerState>) -> Result<Json<Dashboard>, ApiError> {
    let svc = state.svc();
    onboarded_state(&svc)?;
    Ok(Json(svc.dashboard(today()).context("failed to build dashboard")?))
}

async fn onboard(
    State(state): State<ServerState>,
    Query(query): Query<OnboardQuery>,
    Json(form): Json<OnboardingForm>,
) -> Result<(StatusCode, Json<AppState>), ApiError> {
    form.validate()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let already = state.svc().state(today()).context("failed to load state")?.has_onboarded;
    if already && !query.force {
        return Err(ApiError::Conflict(
            "Already onboarded. Use ?force=true to start over".to_string(),
        ));
    }

    // The plan request can take a while; the store stays unlocked meanwhile.
    let profile = build_profile(form.clone(), today());
    let plan = state.planner.generate_plan(&profile).await;

    let app = state
        .svc()
        .onboard(form, plan, today())
        .context("failed to complete onboarding")?;
    Ok((StatusCode::CREATED, Json(app)))
}

async fn complete_task(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let svc = state.svc();
    let app = onboarded_state(&svc)?;
    if app.task(&id).is_none() {
        return Err(ApiError::NotFound(format!("No task with id '{id}'")));
    }
    let (task, award) = svc
        .complete_task(&id, today())
        .context("failed to complete task")?;
    Ok(Json(json!({ "task": task, "award": award })))
}

async fn add_water(
    State(state): State<ServerState>,
    Json(req): Json<WaterRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.amount_ml == 0 {
        return Err(ApiError::BadRequest(
            "amount_ml must be greater than 0".to_string(),
        ));
    }
    let svc = state.svc();
    onboarded_state(&svc)?;
    let (app, award) = svc
        .add_water(req.amount_ml, today())
        .context("failed to add water")?;
    Ok(Json(json!({
        "waterIntakeCurrent": app.water_intake_current,
        "waterIntakeGoal": app.water_intake_goal,
        "award": award,
    })))
}

async fn set_mood(
    State(state): State<ServerState>,
    Json(req): Json<MoodRequest>,
) -> Result<Json<Value>, ApiError> {
    let mood = Mood::parse(&req.mood).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let date = parse_day(req.date.as_deref())?;
    let svc = state.svc();
    onboarded_state(&svc)?;
    svc.set_mood(mood, date, today())
        .context("failed to set mood")?;
    Ok(Json(json!({ "date": date, "mood": mood })))
}

async fn record_weight(
    State(state): State<ServerState>,
    Json(req): Json<WeightRequest>,
) -> Result<Json<Profile>, ApiError> {
    validate_weight(req.weight_kg).map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let date = parse_day(req.date.as_deref())?;
    let svc = state.svc();
    onboarded_state(&svc)?;
    let profile = svc
        .record_weight(req.weight_kg, date, today())
        .context("failed to record weight")?;
    Ok(Json(profile))
}

async fn regenerate_plan(State(state): State<ServerState>) -> Result<Json<AppState>, ApiError> {
    let profile = onboarded_profile(&state.svc())?;
    let plan = state.planner.generate_plan(&profile).await;
    let app = state
        .svc()
        .apply_plan(plan, today())
        .context("failed to apply plan")?;
    Ok(Json(app))
}

async fn list_recipes(
    State(state): State<ServerState>,
    Query(query): Query<RecipesQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = query
        .filter
        .as_deref()
        .map_or(Ok(RecipeFilter::All), RecipeFilter::parse)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let app = state.svc().state(today()).context("failed to load state")?;
    let recipes: Vec<_> = app
        .recipes
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    Ok(Json(json!({
        "filter": filter,
        "averageCalories": average_recipe_calories(&recipes),
        "recipes": recipes,
    })))
}

async fn regenerate_recipes(
    State(state): State<ServerState>,
    Json(req): Json<RegenerateRecipesRequest>,
) -> Result<Json<Value>, ApiError> {
    let profile = onboarded_profile(&state.svc())?;
    let recipes = state
        .planner
        .suggest_recipes(&profile, req.ingredients.as_deref())
        .await;

    let svc = state.svc();
    let replaced = svc
        .apply_recipes(recipes, today())
        .context("failed to apply recipes")?;
    let app = svc.state(today()).context("failed to load state")?;
    Ok(Json(json!({ "replaced": replaced, "recipes": app.recipes })))
}

async fn due_reminders(
    State(state): State<ServerState>,
    Query(query): Query<RemindersQuery>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    let time = match query.time.as_deref() {
        Some(t) => normalize_clock_time(t).map_err(|e| ApiError::BadRequest(format!("{e}")))?,
        None => Local::now().format("%H:%M").to_string(),
    };
    let tasks = state
        .svc()
        .due_tasks(today(), &time)
        .context("failed to load state")?;
    Ok(Json(tasks.iter().map(Reminder::for_task).collect()))
}

async fn calendar_ics(State(state): State<ServerState>) -> Result<Response, ApiError> {
    let today = today();
    let app = state.svc().state(today).context("failed to load state")?;
    let ics = build_calendar(&app.daily_schedule, today, &Local, Utc::now())
        .ok_or_else(|| ApiError::NotFound("No tasks to export".to_string()))?;

    let disposition = format!("attachment; filename=\"{DEFAULT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        ics,
    )
        .into_response())
}

fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/onboard", post(onboard))
        .route("/api/tasks/{id}/complete", post(complete_task))
        .route("/api/water", post(add_water))
        .route("/api/mood", put(set_mood))
        .route("/api/weight", post(record_weight))
        .route("/api/plan/regenerate", post(regenerate_plan))
        .route("/api/recipes", get(list_recipes))
        .route("/api/recipes/regenerate", post(regenerate_recipes))
        .route("/api/reminders", get(due_reminders))
        .route("/api/calendar.ics", get(calendar_ics))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

// --- Server startup ---

/// First and last four bytes of the key. The key file may be hand-edited, so
/// short or non-ASCII keys fall back to an empty edge.
fn key_preview(key: &str) -> String {
    let head = key.get(..4).unwrap_or("");
    let tail = key
        .len()
        .checked_sub(4)
        .and_then(|i| key.get(i..))
        .unwrap_or("");
    format!("{head}...{tail}")
}

pub async fn start_server(
    svc: WellnessService,
    planner: Planner,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = ServerState {
        svc: Arc::new(Mutex::new(svc)),
        planner: Arc::new(planner),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            key_preview(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
