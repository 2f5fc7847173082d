use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use resetliving_core::service::WellnessService;

use super::helpers::{parse_date, today};

const KG_PER_LB: f64 = 0.453_592;

fn to_kg(value: f64, unit: &str) -> Result<f64> {
    match unit.to_lowercase().as_str() {
        "kg" => Ok(value),
        "lbs" | "lb" => Ok(value * KG_PER_LB),
        _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
    }
}

pub(crate) fn cmd_weight_log(
    svc: &WellnessService,
    value: f64,
    unit: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let weight_kg = to_kg(value, unit)?;
    if !unit.eq_ignore_ascii_case("kg") {
        eprintln!("Converting {value:.1} {unit} → {weight_kg:.2} kg");
    }
    let date = parse_date(date)?;
    let profile = svc.record_weight(weight_kg, date, today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("Logged {weight_kg:.1} kg for {date}");
    println!(
        "  Current: {:.1} kg  BMI: {:.1} ({})",
        profile.weight,
        profile.bmi,
        profile.bmi_category.label()
    );
    let to_go = profile.weight - profile.target_weight;
    if to_go.abs() < 0.05 {
        println!("  Target weight reached!");
    } else {
        println!("  {:.1} kg to target ({:.1} kg)", to_go.abs(), profile.target_weight);
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(svc: &WellnessService, days: Option<u32>, json: bool) -> Result<()> {
    let today = today();
    let profile = svc.profile(today)?;
    let cutoff = days.map(|d| today - chrono::Duration::days(i64::from(d)));
    let entries: Vec<_> = profile
        .weight_history
        .iter()
        .filter(|e| cutoff.is_none_or(|c| e.date > c))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        eprintln!("No weight entries found. Use `resetliving weight log` to record your weight.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        kg: String,
        #[tabled(rename = "Change")]
        change: String,
    }

    let mut prev: Option<f64> = None;
    let rows: Vec<WeightRow> = entries
        .iter()
        .map(|e| {
            let change = prev.map_or_else(|| "-".to_string(), |p| format!("{:+.1}", e.weight - p));
            prev = Some(e.weight);
            WeightRow {
                date: e.date.format("%Y-%m-%d").to_string(),
                kg: format!("{:.1}", e.weight),
                change,
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!(
        "Start: {:.1} kg  Target: {:.1} kg",
        profile.start_weight, profile.target_weight
    );
    Ok(())
}
