use anyhow::Result;
use serde_json::json;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use resetliving_core::models::{Recipe, RecipeFilter};
use resetliving_core::progression::average_recipe_calories;
use resetliving_core::service::WellnessService;

use crate::gemini::Planner;

use super::helpers::{today, truncate};

fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Prep")]
        prep: String,
        #[tabled(rename = "kcal")]
        calories: u32,
        #[tabled(rename = "Freezer")]
        freezer: &'static str,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .enumerate()
        .map(|(i, r)| RecipeRow {
            idx: i + 1,
            name: truncate(&r.name, 32),
            prep: if r.prep_time.is_empty() {
                format!("{} min", r.prep_time_minutes)
            } else {
                r.prep_time.clone()
            },
            calories: r.calories,
            freezer: if r.is_meal_prep_friendly { "yes" } else { "no" },
            ingredients: truncate(&r.ingredients.join(", "), 40),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_recipes_list(svc: &WellnessService, filter: &str, json: bool) -> Result<()> {
    let filter = RecipeFilter::parse(filter)?;
    let state = svc.state(today())?;
    let recipes: Vec<Recipe> = state
        .recipes
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    let average = average_recipe_calories(&recipes);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "filter": filter,
                "averageCalories": average,
                "recipes": recipes,
            }))?
        );
        return Ok(());
    }

    if recipes.is_empty() {
        eprintln!("No recipes match. Try `resetliving recipes regenerate`.");
        return Ok(());
    }
    print_recipe_table(&recipes);
    println!("{} recipes, average {average} kcal", recipes.len());
    Ok(())
}

pub(crate) async fn cmd_recipes_regenerate(
    svc: &WellnessService,
    planner: &Planner,
    ingredients: Option<&str>,
    json: bool,
) -> Result<()> {
    let profile = svc.profile(today())?;
    if !json {
        eprintln!("Looking for new meal-prep recipes...");
    }
    let recipes = planner.suggest_recipes(&profile, ingredients).await;
    let replaced = svc.apply_recipes(recipes, today())?;

    if json {
        let state = svc.state(today())?;
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "replaced": replaced, "recipes": state.recipes }))?
        );
    } else if replaced {
        print_recipe_table(&svc.state(today())?.recipes);
    } else {
        eprintln!("No new recipes available right now; keeping your current list.");
    }
    Ok(())
}
