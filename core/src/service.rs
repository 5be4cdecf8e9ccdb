use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate};

use crate::models::{
    Event, MAX_EVENTS, WeekRecord, validate_day_slot, validate_meal_field, validate_mood_score,
};
use crate::store::{WeekState, WeekStore};
use crate::week::{WeekKey, WeekStartDay};

/// Storage backend for weekly rows, addressed by (user, canonical week key).
///
/// The CLI implements this over the local SQLite database or with reqwest
/// against the journal server; tests use [`MemoryBackend`]. Methods are
/// synchronous from the caller's view; async transports adapt with a
/// blocking handle.
pub trait WeekBackend: Send + Sync {
    fn fetch(&self, user_id: &str, week: WeekKey) -> Result<Option<WeekRecord>>;

    /// Insert or replace the row for (user, week).
    fn upsert(&self, user_id: &str, week: WeekKey, record: &WeekRecord) -> Result<()>;

    /// All stored week keys for the user, newest first.
    fn list_week_keys(&self, user_id: &str) -> Result<Vec<WeekKey>>;

    /// Stored rows for the given keys, newest first. Keys without a row are
    /// skipped.
    fn fetch_many(
        &self,
        user_id: &str,
        weeks: &[WeekKey],
    ) -> Result<Vec<(WeekKey, WeekRecord)>>;
}

/// In-memory backend for tests and offline demos.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: Mutex<BTreeMap<(String, WeekKey), WeekRecord>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WeekBackend for MemoryBackend {
    fn fetch(&self, user_id: &str, week: WeekKey) -> Result<Option<WeekRecord>> {
        let rows = self
            .rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(rows.get(&(user_id.to_string(), week)).cloned())
    }

    fn upsert(&self, user_id: &str, week: WeekKey, record: &WeekRecord) -> Result<()> {
        let mut rows = self
            .rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        rows.insert((user_id.to_string(), week), record.clone());
        Ok(())
    }

    fn list_week_keys(&self, user_id: &str) -> Result<Vec<WeekKey>> {
        let rows = self
            .rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut keys: Vec<WeekKey> = rows
            .keys()
            .filter(|(user, _)| user == user_id)
            .map(|(_, week)| *week)
            .collect();
        keys.sort_by(|a, b| b.cmp(a));
        Ok(keys)
    }

    fn fetch_many(
        &self,
        user_id: &str,
        weeks: &[WeekKey],
    ) -> Result<Vec<(WeekKey, WeekRecord)>> {
        let rows = self
            .rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut out: Vec<(WeekKey, WeekRecord)> = weeks
            .iter()
            .filter_map(|week| {
                rows.get(&(user_id.to_string(), *week))
                    .map(|record| (*week, record.clone()))
            })
            .collect();
        out.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(out)
    }
}

/// Coordinates one user's journal session: which week is active, what has
/// been edited, and when edits must be written back.
///
/// Saves are explicit (`save_now`) except for the best-effort flush of a
/// dirty week when the user navigates away from it. Save failures keep the
/// dirty state intact so a retry still has the edits; there are no
/// automatic retries.
pub struct JournalService {
    backend: Box<dyn WeekBackend>,
    store: WeekStore,
    user_id: String,
    start_day: WeekStartDay,
    active: Option<WeekKey>,
    last_saved: Option<DateTime<Local>>,
}

impl JournalService {
    #[must_use]
    pub fn new(backend: Box<dyn WeekBackend>, user_id: &str, start_day: WeekStartDay) -> Self {
        Self {
            backend,
            store: WeekStore::new(),
            user_id: user_id.to_string(),
            start_day,
            active: None,
            last_saved: None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn start_day(&self) -> WeekStartDay {
        self.start_day
    }

    /// Change the displayed week start. Canonical keys never move, so the
    /// active week and all loaded state stay valid.
    pub fn set_start_day(&mut self, start_day: WeekStartDay) {
        self.start_day = start_day;
    }

    #[must_use]
    pub fn active(&self) -> Option<WeekKey> {
        self.active
    }

    #[must_use]
    pub fn last_saved(&self) -> Option<DateTime<Local>> {
        self.last_saved
    }

    /// Make the week containing `date` the active one.
    ///
    /// Leaving a week with unsaved edits fires a best-effort save of its
    /// pending payload first; a failure there is logged, never surfaced.
    /// The new week is then (re)fetched, with a fetch error degrading to
    /// the empty record.
    pub fn activate(&mut self, date: NaiveDate) -> Result<WeekKey> {
        let key = WeekKey::for_date(date);
        if self.active == Some(key) && self.store.state(key) != WeekState::Unloaded {
            return Ok(key);
        }

        if let Some(old) = self.active {
            if old != key {
                self.flush_pending(old);
            }
        }

        self.load_week(key);
        self.active = Some(key);
        Ok(key)
    }

    /// Current editable record of the active week (empty before activation).
    #[must_use]
    pub fn record(&self) -> WeekRecord {
        match self.active {
            Some(key) => self.store.get(key),
            None => WeekRecord::default(),
        }
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.active.is_some_and(|key| self.store.is_dirty(key))
    }

    /// Any week with unsaved edits: the advisory signal checked before the
    /// process exits. No save is attempted here.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        !self.store.dirty_keys().is_empty()
    }

    /// Write the active week to the backend. On success the working state
    /// becomes the committed state; on failure everything stays dirty for a
    /// manual retry.
    pub fn save_now(&mut self) -> Result<()> {
        let key = self.active_key()?;
        let record = self.store.get(key);
        self.backend
            .upsert(&self.user_id, key, &record)
            .with_context(|| format!("Failed to save week {key}"))?;
        self.store.mark_saved(key);
        self.last_saved = Some(Local::now());
        Ok(())
    }

    /// Re-fetch the active week, discarding local edits. Errors leave the
    /// working state untouched: a failed fetch must not act as a discard.
    pub fn refresh(&mut self) -> Result<()> {
        let key = self.active_key()?;
        let token = self.store.begin_load(key);
        let row = match self.backend.fetch(&self.user_id, key) {
            Ok(row) => row,
            Err(err) => {
                self.store.abort_load(token);
                return Err(err.context(format!("Failed to refresh week {key}")));
            }
        };
        let found = row.is_some();
        if self.store.apply_load(token, row) && found {
            self.last_saved = Some(Local::now());
        }
        Ok(())
    }

    // --- Field-level updaters ---

    pub fn add_habit(&mut self, name: &str) -> Result<()> {
        let key = self.active_key()?;
        let name = name.trim();
        if name.is_empty() {
            bail!("Habit name must not be empty");
        }
        if self.store.get(key).habits.trackers.iter().any(|t| t == name) {
            bail!("Habit '{name}' already exists");
        }
        let name = name.to_string();
        self.store.update(key, |mut record| {
            record.habits.completed.insert(name.clone(), [false; 7]);
            record.habits.trackers.push(name);
            record
        });
        Ok(())
    }

    /// Rename a habit, carrying its completion flags to the new name.
    pub fn rename_habit(&mut self, old: &str, new: &str) -> Result<()> {
        let key = self.active_key()?;
        let new = new.trim();
        if new.is_empty() {
            bail!("Habit name must not be empty");
        }
        let record = self.store.get(key);
        let Some(index) = record.habits.trackers.iter().position(|t| t == old) else {
            bail!("No habit named '{old}' this week");
        };
        if new != old && record.habits.trackers.iter().any(|t| t == new) {
            bail!("Habit '{new}' already exists");
        }
        let new = new.to_string();
        let old = old.to_string();
        self.store.update(key, move |mut record| {
            record.habits.trackers[index] = new.clone();
            let days = record.habits.completed.remove(&old).unwrap_or([false; 7]);
            record.habits.completed.insert(new, days);
            record
        });
        Ok(())
    }

    /// Remove a habit and its completion flags; nothing orphaned survives.
    pub fn remove_habit(&mut self, name: &str) -> Result<()> {
        let key = self.active_key()?;
        if !self.store.get(key).habits.trackers.iter().any(|t| t == name) {
            bail!("No habit named '{name}' this week");
        }
        let name = name.to_string();
        self.store.update(key, move |mut record| {
            record.habits.trackers.retain(|t| *t != name);
            record.habits.completed.remove(&name);
            record
        });
        Ok(())
    }

    /// Move a habit from one position to another (0-based).
    pub fn move_habit(&mut self, from: usize, to: usize) -> Result<()> {
        let key = self.active_key()?;
        let len = self.store.get(key).habits.trackers.len();
        if from >= len || to >= len {
            bail!("Habit position out of range (have {len} habits)");
        }
        self.store.update(key, move |mut record| {
            let name = record.habits.trackers.remove(from);
            record.habits.trackers.insert(to, name);
            record
        });
        Ok(())
    }

    /// Flip a habit's completion flag for a Sunday-anchored day slot.
    /// Returns the new flag value.
    pub fn toggle_habit(&mut self, name: &str, slot: usize) -> Result<bool> {
        let key = self.active_key()?;
        validate_day_slot(slot)?;
        if !self.store.get(key).habits.trackers.iter().any(|t| t == name) {
            bail!("No habit named '{name}' this week");
        }
        let name = name.to_string();
        let mut now_done = false;
        self.store.update(key, |mut record| {
            let days = record.habits.completed.entry(name).or_insert([false; 7]);
            days[slot] = !days[slot];
            now_done = days[slot];
            record
        });
        Ok(now_done)
    }

    /// Set the mood for a day. Setting the score already recorded clears it
    /// back to 0 (tap-again-to-unset). Returns the stored value.
    pub fn set_mood(&mut self, slot: usize, score: u8) -> Result<u8> {
        let key = self.active_key()?;
        validate_day_slot(slot)?;
        validate_mood_score(score)?;
        let mut stored = 0;
        self.store.update(key, |mut record| {
            record.moods[slot] = if record.moods[slot] == score { 0 } else { score };
            stored = record.moods[slot];
            record
        });
        Ok(stored)
    }

    pub fn set_meal(&mut self, slot: usize, field: &str, text: String) -> Result<()> {
        let key = self.active_key()?;
        validate_day_slot(slot)?;
        let field = validate_meal_field(field)?;
        self.store.update(key, move |mut record| {
            let day = record.meals.entry(slot as u8).or_default();
            match field.as_str() {
                "breakfast" => day.breakfast = text,
                "lunch" => day.lunch = text,
                "dinner" => day.dinner = text,
                _ => day.extra = text,
            }
            record
        });
        Ok(())
    }

    /// Add a notable event. Rejected when the week already has the maximum
    /// number of events or the date falls outside the active week.
    pub fn add_event(&mut self, date: NaiveDate, text: &str) -> Result<Event> {
        let key = self.active_key()?;
        let text = text.trim();
        if text.is_empty() {
            bail!("Event text must not be empty");
        }
        if self.store.get(key).events.len() >= MAX_EVENTS {
            bail!("Week {key} already has {MAX_EVENTS} events");
        }
        if !key.contains(date) {
            bail!("Event date {date} is outside week {key}");
        }
        let event = Event::new(date, text.to_string());
        let stored = event.clone();
        self.store.update(key, move |mut record| {
            record.events.push(event);
            record
        });
        Ok(stored)
    }

    pub fn remove_event(&mut self, id: &str) -> Result<()> {
        let key = self.active_key()?;
        if !self.store.get(key).events.iter().any(|e| e.id == id) {
            bail!("No event with id '{id}' this week");
        }
        let id = id.to_string();
        self.store.update(key, move |mut record| {
            record.events.retain(|e| e.id != id);
            record
        });
        Ok(())
    }

    pub fn set_grateful(&mut self, text: String) -> Result<()> {
        let key = self.active_key()?;
        self.store.update(key, move |mut record| {
            record.grateful = text;
            record
        });
        Ok(())
    }

    pub fn set_comment(&mut self, text: String) -> Result<()> {
        let key = self.active_key()?;
        self.store.update(key, move |mut record| {
            record.comment = text;
            record
        });
        Ok(())
    }

    #[must_use]
    pub fn backend(&self) -> &dyn WeekBackend {
        self.backend.as_ref()
    }

    fn active_key(&self) -> Result<WeekKey> {
        self.active
            .ok_or_else(|| anyhow::anyhow!("No active week; activate a date first"))
    }

    /// Best-effort save of a week being navigated away from. The pending
    /// payload is cleared before the write is attempted; failure is logged
    /// only.
    fn flush_pending(&mut self, key: WeekKey) {
        let Some(payload) = self.store.take_pending(key) else {
            return;
        };
        match self.backend.upsert(&self.user_id, key, &payload) {
            Ok(()) => {
                self.store.mark_saved(key);
                self.last_saved = Some(Local::now());
            }
            Err(err) => {
                eprintln!("Warning: background save for week {key} failed: {err:#}");
            }
        }
    }

    /// Fetch `key` into the store. A fetch error is logged and degrades to
    /// the empty record.
    fn load_week(&mut self, key: WeekKey) {
        let token = self.store.begin_load(key);
        match self.backend.fetch(&self.user_id, key) {
            Ok(row) => {
                let found = row.is_some();
                if self.store.apply_load(token, row) && found {
                    self.last_saved = Some(Local::now());
                }
            }
            Err(err) => {
                eprintln!("Warning: failed to load week {key}: {err:#}");
                self.store.apply_load(token, None);
            }
        }
    }
}
