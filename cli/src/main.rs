mod commands;
mod config;
mod gemini;
mod notify;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    OnboardArgs, cmd_calendar_export, cmd_done, cmd_export, cmd_import, cmd_mood,
    cmd_notify_disable, cmd_notify_enable, cmd_notify_status, cmd_onboard, cmd_plan_regenerate,
    cmd_profile, cmd_recipes_list, cmd_recipes_regenerate, cmd_remind, cmd_reset, cmd_today,
    cmd_water, cmd_weight_history, cmd_weight_log,
};
use crate::config::Config;
use crate::gemini::Planner;
use crate::notify::TerminalNotifier;
use resetliving_core::models::GLASS_ML;
use resetliving_core::service::WellnessService;

#[derive(Parser)]
#[command(
    name = "resetliving",
    version,
    about = "Redefine your routine: daily plan, hydration, mood and weight tracker",
    long_about = "\n  ResetLiving\n  Redefina sua rotina.\n\n\
        A personalized daily routine with XP, levels and streaks, \
        meal-prep recipes, hydration and weight tracking."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create your profile and generate a personalized plan
    Onboard(OnboardArgs),
    /// Show today's dashboard: level, streak, water, mood and tasks
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Complete a task (by # from `today` or by task ID)
    Done {
        /// Task number or ID
        task: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log water intake
    Water {
        /// Amount in ml (default: one glass)
        #[arg(default_value_t = GLASS_ML)]
        amount: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record how you feel today: great, good, ok, tired, bad
    Mood {
        /// Mood
        mood: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Show your profile, BMI and goal progress
    Profile {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the daily plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Meal-prep recipes
    Recipes {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Export the schedule to an .ics calendar file with reminders
    Calendar {
        /// Output path (default: minha_rotina_resetliving.ics)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Watch the schedule and notify when a task is due (Ctrl-C to stop)
    Remind,
    /// Manage notification permission
    Notify {
        #[command(subcommand)]
        command: NotifyCommands,
    },
    /// Export state as JSON (or history as CSV)
    Export {
        /// Export weight and mood history as CSV instead
        #[arg(long)]
        csv: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import state from a JSON export
    Import {
        /// Path to the JSON file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all data
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weigh-in
    Log {
        /// Weight value (number)
        value: f64,
        /// Unit: kg or lbs (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history
    History {
        /// Number of days to show (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Generate a new routine and recipes, keeping XP and history
    Regenerate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes
    List {
        /// Filter: all, fast (≤ 30 min), complex (> 30 min)
        #[arg(short, long, default_value = "all")]
        filter: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest new recipes, optionally using what you have at home
    Regenerate {
        /// Ingredients available (free text, e.g. "frango, abobrinha, ovos")
        #[arg(short, long)]
        ingredients: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum NotifyCommands {
    /// Allow reminders
    Enable {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Turn reminders off
    Disable {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether reminders are enabled
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = WellnessService::new(&config.db_path)?;
    let planner = Planner::from_config(&config);
    let notifier = TerminalNotifier;

    match cli.command {
        Commands::Onboard(args) => cmd_onboard(&svc, &planner, args).await,
        Commands::Today { json } => cmd_today(&svc, json),
        Commands::Done { task, json } => cmd_done(&svc, &task, json),
        Commands::Water { amount, json } => cmd_water(&svc, amount, json),
        Commands::Mood { mood, date, json } => cmd_mood(&svc, &mood, date, json),
        Commands::Weight { command } => match command {
            WeightCommands::Log {
                value,
                unit,
                date,
                json,
            } => cmd_weight_log(&svc, value, &unit, date, json),
            WeightCommands::History { days, json } => cmd_weight_history(&svc, days, json),
        },
        Commands::Profile { json } => cmd_profile(&svc, json),
        Commands::Plan { command } => match command {
            PlanCommands::Regenerate { json } => cmd_plan_regenerate(&svc, &planner, json).await,
        },
        Commands::Recipes { command } => match command {
            RecipeCommands::List { filter, json } => cmd_recipes_list(&svc, &filter, json),
            RecipeCommands::Regenerate { ingredients, json } => {
                cmd_recipes_regenerate(&svc, &planner, ingredients.as_deref(), json).await
            }
        },
        Commands::Calendar { output, json } => cmd_calendar_export(&svc, output, json),
        Commands::Remind => cmd_remind(&svc, &notifier).await,
        Commands::Notify { command } => match command {
            NotifyCommands::Enable { json } => cmd_notify_enable(&svc, &notifier, json),
            NotifyCommands::Disable { json } => cmd_notify_disable(&svc, json),
            NotifyCommands::Status { json } => cmd_notify_status(&svc, json),
        },
        Commands::Export { csv, output } => cmd_export(&svc, csv, output),
        Commands::Import { file, json } => cmd_import(&svc, &file, json),
        Commands::Reset { yes, json } => cmd_reset(&svc, yes, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                Some(config.load_or_create_api_key()?.0)
            };
            server::start_server(svc, planner, port, &bind, api_key).await
        }
    }
}
