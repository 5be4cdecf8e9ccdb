use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use sevenday_core::week::{WeekKey, WeekStartDay};

pub(crate) const DAY_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
pub(crate) const DAY_FULL: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Parse a Sunday-anchored day slot from a digit (0-6) or a day name.
pub(crate) fn parse_day(s: &str) -> Result<usize> {
    let trimmed = s.trim();
    if let Ok(slot) = trimmed.parse::<usize>() {
        if slot <= 6 {
            return Ok(slot);
        }
        bail!("Day slot must be between 0 (Sunday) and 6 (Saturday)");
    }

    let lower = trimmed.to_lowercase();
    for (slot, name) in DAY_FULL.iter().enumerate() {
        let name = name.to_lowercase();
        if lower == name || (lower.len() >= 3 && name.starts_with(&lower)) {
            return Ok(slot);
        }
    }
    bail!("Invalid day '{s}'. Use a name like 'wed' or a slot 0-6 (0 = Sunday)")
}

/// Slot order for rendering a week under the user's display preference.
/// Slots themselves stay Sunday-anchored; only the presentation rotates.
pub(crate) fn display_slots(start_day: WeekStartDay) -> [usize; 7] {
    match start_day {
        WeekStartDay::Sunday => [0, 1, 2, 3, 4, 5, 6],
        WeekStartDay::Monday => [1, 2, 3, 4, 5, 6, 0],
    }
}

pub(crate) fn mood_label(score: u8) -> &'static str {
    match score {
        1 => "Worst",
        2 => "Awful",
        3 => "Not Bad",
        4 => "Okay",
        5 => "Good",
        6 => "Very Good",
        _ => "-",
    }
}

pub(crate) fn format_week_range(week: WeekKey) -> String {
    format!(
        "{} - {}",
        week.start().format("%b %-d"),
        week.end().format("%b %-d, %Y")
    )
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-06-05".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_day_digits() {
        assert_eq!(parse_day("0").unwrap(), 0);
        assert_eq!(parse_day("6").unwrap(), 6);
        assert!(parse_day("7").is_err());
    }

    #[test]
    fn test_parse_day_names() {
        assert_eq!(parse_day("sunday").unwrap(), 0);
        assert_eq!(parse_day("Sun").unwrap(), 0);
        assert_eq!(parse_day("wed").unwrap(), 3);
        assert_eq!(parse_day("Saturday").unwrap(), 6);
        assert!(parse_day("su").is_err());
        assert!(parse_day("someday").is_err());
    }

    #[test]
    fn test_display_slots() {
        assert_eq!(display_slots(WeekStartDay::Sunday), [0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(display_slots(WeekStartDay::Monday), [1, 2, 3, 4, 5, 6, 0]);
    }

    #[test]
    fn test_mood_label() {
        assert_eq!(mood_label(0), "-");
        assert_eq!(mood_label(1), "Worst");
        assert_eq!(mood_label(6), "Very Good");
    }

    #[test]
    fn test_format_week_range() {
        let week = WeekKey::parse("2024-06-02").unwrap();
        assert_eq!(format_week_range(week), "Jun 2 - Jun 8, 2024");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        // Should not panic on multi-byte characters
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }
}
