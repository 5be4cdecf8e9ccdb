use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Maximum notable events per week.
pub const MAX_EVENTS: usize = 3;

/// Mood scores run 1 (worst) to 6 (best); 0 means "not set".
pub const MOOD_MAX: u8 = 6;

pub const MEAL_FIELDS: &[&str] = &["breakfast", "lunch", "dinner", "extra"];

/// Free-text meal notes for one day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayMeals {
    #[serde(default)]
    pub breakfast: String,
    #[serde(default)]
    pub lunch: String,
    #[serde(default)]
    pub dinner: String,
    #[serde(default)]
    pub extra: String,
}

impl DayMeals {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakfast.trim().is_empty()
            && self.lunch.trim().is_empty()
            && self.dinner.trim().is_empty()
            && self.extra.trim().is_empty()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "breakfast" => Some(&self.breakfast),
            "lunch" => Some(&self.lunch),
            "dinner" => Some(&self.dinner),
            "extra" => Some(&self.extra),
            _ => None,
        }
    }

    pub fn set_field(&mut self, name: &str, value: String) -> Result<()> {
        let slot = match name {
            "breakfast" => &mut self.breakfast,
            "lunch" => &mut self.lunch,
            "dinner" => &mut self.dinner,
            "extra" => &mut self.extra,
            _ => bail!(
                "Invalid meal field '{name}'. Must be one of: {}",
                MEAL_FIELDS.join(", ")
            ),
        };
        *slot = value;
        Ok(())
    }
}

pub fn validate_meal_field(name: &str) -> Result<String> {
    let lower = name.to_lowercase();
    if MEAL_FIELDS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid meal field '{name}'. Must be one of: {}",
            MEAL_FIELDS.join(", ")
        )
    }
}

/// Habit names in user order plus per-habit completion flags.
/// Completion slots are Sunday-anchored (slot 0 = Sunday) no matter which
/// week start the user displays.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Habits {
    #[serde(default)]
    pub trackers: Vec<String>,
    #[serde(default)]
    pub completed: BTreeMap<String, [bool; 7]>,
}

/// One notable event within the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(deserialize_with = "flexible_date")]
    pub date: NaiveDate,
    pub text: String,
}

impl Event {
    #[must_use]
    pub fn new(date: NaiveDate, text: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            text,
        }
    }
}

/// One user's journal entries for one calendar week.
///
/// Every field defaults so sparse backend rows (older clients omitted
/// sections they never rendered) decode to the empty record's values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeekRecord {
    #[serde(default)]
    pub habits: Habits,
    #[serde(default)]
    pub moods: [u8; 7],
    #[serde(default)]
    pub meals: BTreeMap<u8, DayMeals>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub grateful: String,
    #[serde(default)]
    pub comment: String,
}

impl WeekRecord {
    /// Canonical form used for change detection.
    ///
    /// Structural slop that does not change meaning is removed: completion
    /// rows for habits no longer tracked, missing rows for tracked habits,
    /// all-empty meal days, and meal keys outside 0-6. Event dates need no
    /// work here; representation differences are resolved when the record
    /// is decoded. Idempotent.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut out = self.clone();
        out.habits.completed = self
            .habits
            .trackers
            .iter()
            .map(|name| {
                let days = self
                    .habits
                    .completed
                    .get(name)
                    .copied()
                    .unwrap_or([false; 7]);
                (name.clone(), days)
            })
            .collect();
        out.meals = self
            .meals
            .iter()
            .filter(|(day, meals)| **day <= 6 && !meals.is_empty())
            .map(|(day, meals)| (*day, meals.clone()))
            .collect();
        out
    }

    /// True when the record carries no user content.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.normalize() == Self::default()
    }
}

pub fn validate_mood_score(score: u8) -> Result<()> {
    if score > MOOD_MAX {
        bail!("Mood score must be between 0 (not set) and {MOOD_MAX} (got {score})");
    }
    Ok(())
}

pub fn validate_day_slot(slot: usize) -> Result<()> {
    if slot > 6 {
        bail!("Day slot must be between 0 (Sunday) and 6 (Saturday) (got {slot})");
    }
    Ok(())
}

/// Parse an event date as stored by any client generation: plain
/// `YYYY-MM-DD`, RFC 3339, or a zone-less timestamp.
pub fn parse_event_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    bail!("Invalid event date '{raw}'. Use YYYY-MM-DD or RFC 3339")
}

fn flexible_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_event_date(&raw).map_err(serde::de::Error::custom)
}
