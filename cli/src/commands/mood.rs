use anyhow::Result;
use serde_json::json;

use resetliving_core::models::Mood;
use resetliving_core::service::WellnessService;

use super::helpers::{parse_date, today};

pub(crate) fn cmd_mood(
    svc: &WellnessService,
    mood: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let mood = Mood::parse(mood)?;
    let date = parse_date(date)?;
    svc.set_mood(mood, date, today())?;

    if json {
        println!("{}", json!({ "date": date, "mood": mood }));
    } else {
        println!("Mood for {date}: {} {}", mood.emoji(), mood.as_str());
    }
    Ok(())
}
