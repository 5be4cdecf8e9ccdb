use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::WeekRecord;
use crate::prefs::PreferenceStore;
use crate::service::WeekBackend;
use crate::week::WeekKey;

/// Local SQLite storage: one row per (user, canonical week key), with the
/// journal sections stored as JSON columns, plus a per-user preference
/// table.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS weekly_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    week_start TEXT NOT NULL,
                    habits TEXT NOT NULL,
                    moods TEXT NOT NULL,
                    meals TEXT NOT NULL,
                    events TEXT NOT NULL,
                    grateful TEXT NOT NULL,
                    comment TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(user_id, week_start)
                );

                CREATE INDEX IF NOT EXISTS idx_weekly_entries_user
                    ON weekly_entries(user_id, week_start);

                CREATE TABLE IF NOT EXISTS prefs (
                    user_id TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (user_id, key)
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    pub fn upsert_week(&self, user_id: &str, week: WeekKey, record: &WeekRecord) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO weekly_entries
                (user_id, week_start, habits, moods, meals, events, grateful, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(user_id, week_start) DO UPDATE SET
                habits = excluded.habits,
                moods = excluded.moods,
                meals = excluded.meals,
                events = excluded.events,
                grateful = excluded.grateful,
                comment = excluded.comment,
                updated_at = excluded.updated_at",
            params![
                user_id,
                week.to_string(),
                serde_json::to_string(&record.habits)?,
                serde_json::to_string(&record.moods)?,
                serde_json::to_string(&record.meals)?,
                serde_json::to_string(&record.events)?,
                record.grateful,
                record.comment,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn fetch_week(&self, user_id: &str, week: WeekKey) -> Result<Option<WeekRecord>> {
        let raw = self
            .conn
            .query_row(
                "SELECT habits, moods, meals, events, grateful, comment
                 FROM weekly_entries WHERE user_id = ?1 AND week_start = ?2",
                params![user_id, week.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((habits, moods, meals, events, grateful, comment)) = raw else {
            return Ok(None);
        };

        Ok(Some(WeekRecord {
            habits: serde_json::from_str(&habits).context("Corrupt habits column")?,
            moods: serde_json::from_str(&moods).context("Corrupt moods column")?,
            meals: serde_json::from_str(&meals).context("Corrupt meals column")?,
            events: serde_json::from_str(&events).context("Corrupt events column")?,
            grateful,
            comment,
        }))
    }

    pub fn list_week_keys(&self, user_id: &str) -> Result<Vec<WeekKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT week_start FROM weekly_entries WHERE user_id = ?1 ORDER BY week_start DESC",
        )?;
        let raw: Vec<String> = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter()
            .map(|key| {
                WeekKey::parse(key).with_context(|| format!("Corrupt week key in database: '{key}'"))
            })
            .collect()
    }

    pub fn fetch_many(
        &self,
        user_id: &str,
        weeks: &[WeekKey],
    ) -> Result<Vec<(WeekKey, WeekRecord)>> {
        let mut out = Vec::with_capacity(weeks.len());
        for week in weeks {
            if let Some(record) = self.fetch_week(user_id, *week)? {
                out.push((*week, record));
            }
        }
        out.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(out)
    }

    pub fn get_pref(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM prefs WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_pref(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO prefs (user_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value",
            params![user_id, key, value],
        )?;
        Ok(())
    }

}

/// [`WeekBackend`] and [`PreferenceStore`] over a local database. The
/// connection sits behind a mutex because the backend trait is shared
/// across threads by the server.
pub struct LocalBackend {
    db: Mutex<Database>,
}

impl LocalBackend {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(Database::open(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
        })
    }

    fn db(&self) -> std::sync::MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl WeekBackend for LocalBackend {
    fn fetch(&self, user_id: &str, week: WeekKey) -> Result<Option<WeekRecord>> {
        self.db().fetch_week(user_id, week)
    }

    fn upsert(&self, user_id: &str, week: WeekKey, record: &WeekRecord) -> Result<()> {
        self.db().upsert_week(user_id, week, record)
    }

    fn list_week_keys(&self, user_id: &str) -> Result<Vec<WeekKey>> {
        self.db().list_week_keys(user_id)
    }

    fn fetch_many(
        &self,
        user_id: &str,
        weeks: &[WeekKey],
    ) -> Result<Vec<(WeekKey, WeekRecord)>> {
        self.db().fetch_many(user_id, weeks)
    }
}

impl PreferenceStore for LocalBackend {
    fn get(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        self.db().get_pref(user_id, key)
    }

    fn set(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        self.db().set_pref(user_id, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayMeals, Event};
    use chrono::NaiveDate;

    fn key(s: &str) -> WeekKey {
        WeekKey::parse(s).unwrap()
    }

    fn sample_record() -> WeekRecord {
        let mut record = WeekRecord::default();
        record.habits.trackers.push("Run".to_string());
        record.habits.completed.insert(
            "Run".to_string(),
            [true, false, true, false, false, false, false],
        );
        record.moods = [0, 3, 0, 5, 0, 0, 0];
        record.meals.insert(
            2,
            DayMeals {
                dinner: "tacos".to_string(),
                ..DayMeals::default()
            },
        );
        record.events.push(Event {
            id: "e1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            text: "concert".to_string(),
        });
        record.grateful = "good coffee".to_string();
        record.comment = "solid week".to_string();
        record
    }

    #[test]
    fn test_fetch_missing_returns_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.fetch_week("alice", key("2024-06-02")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_fetch_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let record = sample_record();
        db.upsert_week("alice", key("2024-06-02"), &record).unwrap();

        let loaded = db.fetch_week("alice", key("2024-06-02")).unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let week = key("2024-06-02");
        db.upsert_week("alice", week, &sample_record()).unwrap();

        let mut updated = sample_record();
        updated.comment = "changed my mind".to_string();
        db.upsert_week("alice", week, &updated).unwrap();

        let loaded = db.fetch_week("alice", week).unwrap().unwrap();
        assert_eq!(loaded.comment, "changed my mind");

        // Still a single row for the key
        assert_eq!(db.list_week_keys("alice").unwrap(), vec![week]);
    }

    #[test]
    fn test_rows_scoped_per_user() {
        let db = Database::open_in_memory().unwrap();
        let week = key("2024-06-02");
        db.upsert_week("alice", week, &sample_record()).unwrap();

        assert!(db.fetch_week("bob", week).unwrap().is_none());
        assert!(db.list_week_keys("bob").unwrap().is_empty());
    }

    #[test]
    fn test_list_week_keys_descending() {
        let db = Database::open_in_memory().unwrap();
        for k in ["2024-05-26", "2024-06-09", "2024-06-02"] {
            db.upsert_week("alice", key(k), &WeekRecord::default())
                .unwrap();
        }

        let keys = db.list_week_keys("alice").unwrap();
        assert_eq!(
            keys,
            vec![key("2024-06-09"), key("2024-06-02"), key("2024-05-26")]
        );
    }

    #[test]
    fn test_fetch_many_skips_missing_and_sorts() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_week("alice", key("2024-05-26"), &WeekRecord::default())
            .unwrap();
        db.upsert_week("alice", key("2024-06-09"), &WeekRecord::default())
            .unwrap();

        let rows = db
            .fetch_many(
                "alice",
                &[key("2024-05-26"), key("2024-06-02"), key("2024-06-09")],
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, key("2024-06-09"));
        assert_eq!(rows[1].0, key("2024-05-26"));
    }

    #[test]
    fn test_prefs_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_pref("alice", "week_start").unwrap().is_none());

        db.set_pref("alice", "week_start", "monday").unwrap();
        assert_eq!(
            db.get_pref("alice", "week_start").unwrap().as_deref(),
            Some("monday")
        );

        db.set_pref("alice", "week_start", "sunday").unwrap();
        assert_eq!(
            db.get_pref("alice", "week_start").unwrap().as_deref(),
            Some("sunday")
        );

        assert!(db.get_pref("bob", "week_start").unwrap().is_none());
    }

    #[test]
    fn test_local_backend_trait_impls() {
        let backend = LocalBackend::open_in_memory().unwrap();
        let week = key("2024-06-02");
        backend.upsert("alice", week, &sample_record()).unwrap();

        let loaded = backend.fetch("alice", week).unwrap().unwrap();
        assert_eq!(loaded.grateful, "good coffee");
        assert_eq!(backend.list_week_keys("alice").unwrap(), vec![week]);

        backend.set("alice", "week_start", "monday").unwrap();
        assert_eq!(
            backend.get("alice", "week_start").unwrap().as_deref(),
            Some("monday")
        );
    }
}
