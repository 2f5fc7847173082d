use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AppState, MoodEntry, WeightEntry};
use crate::progression::level_for_xp;

pub fn export_state(state: &AppState) -> Result<String> {
    serde_json::to_string_pretty(state).context("Failed to serialize state")
}

/// Parse a state blob (ours or one copied from the web client's storage) and
/// restore its invariants: derived level and one history entry per date.
pub fn import_state(json: &str) -> Result<AppState> {
    let mut state: AppState =
        serde_json::from_str(json).context("Invalid ResetLiving state JSON")?;
    normalize_state(&mut state);
    Ok(state)
}

pub fn normalize_state(state: &mut AppState) {
    state.user_level = level_for_xp(state.user_xp);
    state.mood_history = dedup_by_date(std::mem::take(&mut state.mood_history), |m| m.date);
    if let Some(profile) = state.profile.as_mut() {
        profile.weight_history =
            dedup_by_date(std::mem::take(&mut profile.weight_history), |w| w.date);
        if profile.start_weight <= 0.0 {
            profile.start_weight = profile
                .weight_history
                .first()
                .map_or(profile.weight, |w| w.weight);
        }
        if profile.target_weight <= 0.0 {
            profile.target_weight = profile.weight;
        }
    }
    state.has_onboarded = state.has_onboarded && state.profile.is_some();
}

/// Keep the last entry for each date, ordered by date.
fn dedup_by_date<T>(entries: Vec<T>, date: impl Fn(&T) -> NaiveDate) -> Vec<T> {
    let mut by_date: BTreeMap<NaiveDate, T> = BTreeMap::new();
    for e in entries {
        by_date.insert(date(&e), e);
    }
    by_date.into_values().collect()
}

#[derive(Serialize)]
struct HistoryRow {
    date: NaiveDate,
    kind: &'static str,
    value: String,
}

/// Write weight and mood history as CSV (`date,kind,value`).
pub fn write_history_csv<W: Write>(state: &AppState, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut count = 0;

    let mut weights: Vec<&WeightEntry> = state
        .profile
        .as_ref()
        .map(|p| p.weight_history.iter().collect())
        .unwrap_or_default();
    weights.sort_by_key(|w| w.date);
    for w in weights {
        wtr.serialize(HistoryRow {
            date: w.date,
            kind: "weight",
            value: format!("{:.1}", w.weight),
        })?;
        count += 1;
    }

    let mut moods: Vec<&MoodEntry> = state.mood_history.iter().collect();
    moods.sort_by_key(|m| m.date);
    for m in moods {
        wtr.serialize(HistoryRow {
            date: m.date,
            kind: "mood",
            value: m.mood.as_str().to_string(),
        })?;
        count += 1;
    }

    wtr.flush().context("Failed to write CSV")?;
    Ok(count)
}
