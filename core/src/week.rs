use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// First day of the displayed week. Display-only: persistence keys are
/// always Sunday-anchored regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekStartDay {
    #[default]
    Sunday,
    Monday,
}

impl WeekStartDay {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
        }
    }
}

impl FromStr for WeekStartDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            other => bail!("Invalid week start '{other}'. Must be 'sunday' or 'monday'"),
        }
    }
}

impl fmt::Display for WeekStartDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First day of the 7-day window containing `date` under the given
/// convention. Monday convention steps a Sunday back 6 days, any other
/// weekday back `weekday - 1` days; Sunday convention steps back the
/// plain Sunday-based weekday number.
#[must_use]
pub fn week_start(date: NaiveDate, start_day: WeekStartDay) -> NaiveDate {
    let back = match start_day {
        WeekStartDay::Sunday => date.weekday().num_days_from_sunday(),
        WeekStartDay::Monday => date.weekday().num_days_from_monday(),
    };
    date - Duration::days(i64::from(back))
}

/// Week key under the user's display preference. Only for UI grouping,
/// never for persistence addressing.
#[must_use]
pub fn display_week_key(date: NaiveDate, start_day: WeekStartDay) -> String {
    week_start(date, start_day).format("%Y-%m-%d").to_string()
}

/// Canonical storage key for one calendar week: the Sunday beginning the
/// Sunday-anchored 7-day window containing the reference date.
///
/// Keys are computed with the Sunday convention no matter what week start
/// the user displays; the same calendar week always addresses the same
/// backend row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self(week_start(date, WeekStartDay::Sunday))
    }

    /// Parse a stored key. Rejects dates that are not Sundays.
    pub fn parse(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| anyhow::anyhow!("Invalid week key '{s}'. Use YYYY-MM-DD"))?;
        if date.weekday() != Weekday::Sun {
            bail!("Invalid week key '{s}': not a Sunday");
        }
        Ok(Self(date))
    }

    #[must_use]
    pub fn start(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn end(self) -> NaiveDate {
        self.0 + Duration::days(6)
    }

    /// The seven dates of this week, Sunday first.
    #[must_use]
    pub fn dates(self) -> [NaiveDate; 7] {
        std::array::from_fn(|i| self.0 + Duration::days(i as i64))
    }

    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    /// Sunday-anchored slot (0-6) of `date` within this week.
    #[must_use]
    pub fn day_slot(self, date: NaiveDate) -> Option<usize> {
        if self.contains(date) {
            Some((date - self.0).num_days() as usize)
        } else {
            None
        }
    }

    #[must_use]
    pub fn prev(self) -> Self {
        Self(self.0 - Duration::days(7))
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + Duration::days(7))
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_start_sunday_convention() {
        // 2024-06-05 is a Wednesday; the Sunday window starts 2024-06-02
        assert_eq!(
            week_start(date(2024, 6, 5), WeekStartDay::Sunday),
            date(2024, 6, 2)
        );
        // A Sunday is its own window start
        assert_eq!(
            week_start(date(2024, 6, 2), WeekStartDay::Sunday),
            date(2024, 6, 2)
        );
        // A Saturday steps back 6 days
        assert_eq!(
            week_start(date(2024, 6, 8), WeekStartDay::Sunday),
            date(2024, 6, 2)
        );
    }

    #[test]
    fn test_week_start_monday_convention() {
        // A Monday is its own window start
        assert_eq!(
            week_start(date(2024, 6, 3), WeekStartDay::Monday),
            date(2024, 6, 3)
        );
        // A Sunday steps back 6 days to the previous Monday
        assert_eq!(
            week_start(date(2024, 6, 9), WeekStartDay::Monday),
            date(2024, 6, 3)
        );
        // A Wednesday steps back 2 days
        assert_eq!(
            week_start(date(2024, 6, 5), WeekStartDay::Monday),
            date(2024, 6, 3)
        );
    }

    #[test]
    fn test_canonical_key_stable_within_window() {
        // Every date in the Sunday-anchored window maps to the same key
        let expected = WeekKey::for_date(date(2024, 6, 2));
        for offset in 0..7 {
            let d = date(2024, 6, 2) + Duration::days(offset);
            assert_eq!(WeekKey::for_date(d), expected);
        }
        // The next Sunday starts a new window
        assert_ne!(WeekKey::for_date(date(2024, 6, 9)), expected);
    }

    #[test]
    fn test_canonical_key_ignores_display_preference() {
        // Monday 2024-06-03 displays as its own week start under the monday
        // convention, but its canonical key is still the preceding Sunday.
        let monday = date(2024, 6, 3);
        assert_eq!(week_start(monday, WeekStartDay::Monday), monday);
        assert_eq!(WeekKey::for_date(monday).to_string(), "2024-06-02");
    }

    #[test]
    fn test_display_key_differs_from_canonical_for_monday_pref() {
        let wednesday = date(2024, 6, 5);
        assert_eq!(
            display_week_key(wednesday, WeekStartDay::Sunday),
            "2024-06-02"
        );
        assert_eq!(
            display_week_key(wednesday, WeekStartDay::Monday),
            "2024-06-03"
        );
        assert_eq!(WeekKey::for_date(wednesday).to_string(), "2024-06-02");
    }

    #[test]
    fn test_key_parse_roundtrip() {
        let key = WeekKey::parse("2024-06-02").unwrap();
        assert_eq!(key.to_string(), "2024-06-02");
        assert_eq!(key, WeekKey::for_date(date(2024, 6, 2)));
    }

    #[test]
    fn test_key_parse_rejects_non_sunday() {
        assert!(WeekKey::parse("2024-06-03").is_err());
        assert!(WeekKey::parse("not-a-date").is_err());
    }

    #[test]
    fn test_week_dates_and_slots() {
        let key = WeekKey::parse("2024-06-02").unwrap();
        let dates = key.dates();
        assert_eq!(dates[0], date(2024, 6, 2));
        assert_eq!(dates[6], date(2024, 6, 8));
        assert_eq!(key.day_slot(date(2024, 6, 2)), Some(0));
        assert_eq!(key.day_slot(date(2024, 6, 8)), Some(6));
        assert_eq!(key.day_slot(date(2024, 6, 9)), None);
        assert!(key.contains(date(2024, 6, 5)));
        assert!(!key.contains(date(2024, 6, 1)));
    }

    #[test]
    fn test_prev_next() {
        let key = WeekKey::parse("2024-06-02").unwrap();
        assert_eq!(key.next().to_string(), "2024-06-09");
        assert_eq!(key.prev().to_string(), "2024-05-26");
        assert_eq!(key.next().prev(), key);
    }

    #[test]
    fn test_week_start_day_parse() {
        assert_eq!(
            "sunday".parse::<WeekStartDay>().unwrap(),
            WeekStartDay::Sunday
        );
        assert_eq!(
            "Monday".parse::<WeekStartDay>().unwrap(),
            WeekStartDay::Monday
        );
        assert_eq!("mon".parse::<WeekStartDay>().unwrap(), WeekStartDay::Monday);
        assert!("tuesday".parse::<WeekStartDay>().is_err());
    }

    #[test]
    fn test_key_serde_as_string() {
        let key = WeekKey::parse("2024-06-02").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-06-02\"");
        let back: WeekKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
