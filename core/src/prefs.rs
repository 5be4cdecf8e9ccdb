use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use crate::week::WeekStartDay;

pub const WEEK_START_KEY: &str = "week_start";

/// Per-user key/value preference storage.
///
/// The CLI backs this with the local SQLite database; `MemoryPrefs` stands
/// in when no data directory is available. Preferences are display-side
/// only and never affect persistence addressing.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, user_id: &str, key: &str) -> Result<Option<String>>;
    fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()>;
}

/// In-memory fallback store. Values last for the process lifetime only.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: Mutex<HashMap<(String, String), String>>,
}

impl MemoryPrefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPrefs {
    fn get(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(values.get(&(user_id.to_string(), key.to_string())).cloned())
    }

    fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        values.insert((user_id.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

/// Stored week-start preference for `user_id`. Missing, unreadable, or
/// unparsable values fall back to Sunday so a broken store never blocks
/// startup.
#[must_use]
pub fn load_week_start(store: &dyn PreferenceStore, user_id: &str) -> WeekStartDay {
    match store.get(user_id, WEEK_START_KEY) {
        Ok(Some(value)) => value.parse().unwrap_or_default(),
        Ok(None) | Err(_) => WeekStartDay::default(),
    }
}

pub fn store_week_start(
    store: &dyn PreferenceStore,
    user_id: &str,
    day: WeekStartDay,
) -> Result<()> {
    store.set(user_id, WEEK_START_KEY, day.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_prefs_roundtrip() {
        let prefs = MemoryPrefs::new();
        assert_eq!(prefs.get("alice", "week_start").unwrap(), None);

        prefs.set("alice", "week_start", "monday").unwrap();
        assert_eq!(
            prefs.get("alice", "week_start").unwrap().as_deref(),
            Some("monday")
        );
    }

    #[test]
    fn test_prefs_are_scoped_per_user() {
        let prefs = MemoryPrefs::new();
        prefs.set("alice", "week_start", "monday").unwrap();
        assert_eq!(prefs.get("bob", "week_start").unwrap(), None);
    }

    #[test]
    fn test_load_week_start_defaults() {
        let prefs = MemoryPrefs::new();
        assert_eq!(load_week_start(&prefs, "alice"), WeekStartDay::Sunday);

        prefs.set("alice", WEEK_START_KEY, "monday").unwrap();
        assert_eq!(load_week_start(&prefs, "alice"), WeekStartDay::Monday);

        prefs.set("alice", WEEK_START_KEY, "someday").unwrap();
        assert_eq!(load_week_start(&prefs, "alice"), WeekStartDay::Sunday);
    }

    #[test]
    fn test_store_week_start() {
        let prefs = MemoryPrefs::new();
        store_week_start(&prefs, "alice", WeekStartDay::Monday).unwrap();
        assert_eq!(load_week_start(&prefs, "alice"), WeekStartDay::Monday);
    }
}
