//! iCalendar export of the daily schedule, for importing into phone or
//! voice-assistant calendars.

use std::fmt::Write;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::models::Task;

pub const EVENT_MINUTES: i64 = 30;
pub const DEFAULT_FILE_NAME: &str = "minha_rotina_resetliving.ics";

const ICS_STAMP: &str = "%Y%m%dT%H%M%SZ";

/// Escape TEXT values per RFC 5545 section 3.3.11.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

/// Build a calendar with one 30-minute event per task on `day`, each with a
/// reminder at the start time. Returns `None` for an empty schedule.
///
/// Task times are interpreted in `tz` and written out in UTC. Tasks whose
/// time does not parse, or falls in a DST gap, are skipped.
#[must_use]
pub fn build_calendar<Tz: TimeZone>(
    tasks: &[Task],
    day: NaiveDate,
    tz: &Tz,
    stamp: DateTime<Utc>,
) -> Option<String> {
    if tasks.is_empty() {
        return None;
    }

    let dt_stamp = stamp.format(ICS_STAMP).to_string();
    let mut out = String::new();
    for line in [
        "BEGIN:VCALENDAR",
        "VERSION:2.0",
        "PRODID:-//ResetLiving//Routine App//PT-BR",
        "CALSCALE:GREGORIAN",
        "METHOD:PUBLISH",
        "X-WR-CALNAME:Rotina ResetLiving",
    ] {
        push_line(&mut out, line);
    }

    for task in tasks {
        let Ok(time) = NaiveTime::parse_from_str(&task.time, "%H:%M") else {
            log::warn!("skipping task {} with invalid time '{}'", task.id, task.time);
            continue;
        };
        let Some(start) = tz.from_local_datetime(&day.and_time(time)).earliest() else {
            continue;
        };
        let start = start.with_timezone(&Utc);
        let end = start + Duration::minutes(EVENT_MINUTES);

        push_line(&mut out, "BEGIN:VEVENT");
        let _ = write!(out, "UID:{}-{dt_stamp}@resetliving.app\r\n", task.id);
        let _ = write!(out, "DTSTAMP:{dt_stamp}\r\n");
        let _ = write!(out, "DTSTART:{}\r\n", start.format(ICS_STAMP));
        let _ = write!(out, "DTEND:{}\r\n", end.format(ICS_STAMP));
        let _ = write!(out, "SUMMARY:ResetLiving: {}\r\n", escape_text(&task.title));
        let _ = write!(out, "DESCRIPTION:{}\r\n", escape_text(&task.description));
        push_line(&mut out, "STATUS:CONFIRMED");
        push_line(&mut out, "BEGIN:VALARM");
        push_line(&mut out, "TRIGGER:-PT0M");
        push_line(&mut out, "ACTION:DISPLAY");
        push_line(&mut out, "DESCRIPTION:Lembrete ResetLiving");
        push_line(&mut out, "END:VALARM");
        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskType;
    use chrono::FixedOffset;

    fn task(id: &str, time: &str, title: &str, description: &str) -> Task {
        Task {
            id: id.to_string(),
            time: time.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            kind: TaskType::Habit,
            completed: false,
            xp_reward: 10,
            calories: None,
        }
    }

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_empty_schedule_has_no_calendar() {
        assert!(build_calendar(&[], day(), &Utc, stamp()).is_none());
    }

    #[test]
    fn test_one_event_and_alarm_per_task() {
        let tasks = vec![
            task("1", "07:00", "Café", "Ovos"),
            task("2", "13:00", "Almoço", "Frango"),
        ];
        let ics = build_calendar(&tasks, day(), &Utc, stamp()).unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert_eq!(ics.matches("BEGIN:VALARM").count(), 2);
        assert_eq!(ics.matches("TRIGGER:-PT0M").count(), 2);
        assert!(ics.contains("DTSTART:20240501T070000Z\r\n"));
        assert!(ics.contains("DTEND:20240501T073000Z\r\n"));
        assert!(ics.contains("UID:1-20240501T060000Z@resetliving.app\r\n"));
        assert!(ics.contains("SUMMARY:ResetLiving: Almoço\r\n"));
    }

    #[test]
    fn test_times_converted_to_utc() {
        let sao_paulo = FixedOffset::west_opt(3 * 3600).unwrap();
        let tasks = vec![task("1", "22:45", "Dormir", "")];
        let ics = build_calendar(&tasks, day(), &sao_paulo, stamp()).unwrap();
        assert!(ics.contains("DTSTART:20240502T014500Z\r\n"));
        assert!(ics.contains("DTEND:20240502T021500Z\r\n"));
    }

    #[test]
    fn test_text_is_escaped() {
        let tasks = vec![task("1", "12:00", "Almoço; leve", "Arroz, feijão\nsalada")];
        let ics = build_calendar(&tasks, day(), &Utc, stamp()).unwrap();
        assert!(ics.contains("SUMMARY:ResetLiving: Almoço\\; leve\r\n"));
        assert!(ics.contains("DESCRIPTION:Arroz\\, feijão\\nsalada\r\n"));
    }

    #[test]
    fn test_invalid_time_skipped() {
        let tasks = vec![task("1", "lunch", "x", ""), task("2", "08:00", "y", "")];
        let ics = build_calendar(&tasks, day(), &Utc, stamp()).unwrap();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    }
}
