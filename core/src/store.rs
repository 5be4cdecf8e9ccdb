use std::collections::{HashMap, HashSet};

use crate::models::WeekRecord;
use crate::week::WeekKey;

/// Lifecycle of one week's record. Each key moves through its own machine:
/// `Unloaded -> Loading -> {Clean, Dirty}`, back to `Clean` on save or
/// reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekState {
    Unloaded,
    Loading,
    Clean,
    Dirty,
}

/// Handed out by [`WeekStore::begin_load`]. The matching load result may
/// only be applied while no save or newer load has been issued for the
/// same key.
#[derive(Debug, Clone, Copy)]
pub struct LoadToken {
    key: WeekKey,
    revision: u64,
}

/// In-memory working/committed state for every week touched this session,
/// keyed by canonical week key.
///
/// `working` holds the record the user is editing; `committed` holds the
/// last state confirmed written to or read from the backend. Dirtiness is
/// recomputed on every update from the normalized forms of the two, and the
/// latest dirty record is cached as the pending-save payload.
#[derive(Debug, Default)]
pub struct WeekStore {
    working: HashMap<WeekKey, WeekRecord>,
    committed: HashMap<WeekKey, WeekRecord>,
    pending: HashMap<WeekKey, WeekRecord>,
    revisions: HashMap<WeekKey, u64>,
    loading: HashSet<WeekKey>,
}

impl WeekStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current editable record, or an empty default when the key has never
    /// been loaded. The default is not inserted.
    #[must_use]
    pub fn get(&self, key: WeekKey) -> WeekRecord {
        self.working.get(&key).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn committed(&self, key: WeekKey) -> Option<&WeekRecord> {
        self.committed.get(&key)
    }

    /// Install a fetched record (or the empty default when the backend has
    /// no row) as both working and committed state, clearing dirtiness and
    /// any pending payload. Invalidates in-flight loads for the key.
    pub fn load(&mut self, key: WeekKey, record: Option<WeekRecord>) {
        self.bump(key);
        self.install(key, record);
    }

    /// Start a fetch for `key`. The returned token must be passed to
    /// [`Self::apply_load`] with the fetch result.
    pub fn begin_load(&mut self, key: WeekKey) -> LoadToken {
        let revision = self.bump(key);
        self.loading.insert(key);
        LoadToken { key, revision }
    }

    /// Apply a fetch result. Returns false (and changes nothing) when the
    /// token went stale because a save or newer load was issued since.
    pub fn apply_load(&mut self, token: LoadToken, record: Option<WeekRecord>) -> bool {
        if self.revisions.get(&token.key).copied() != Some(token.revision) {
            return false;
        }
        self.install(token.key, record);
        true
    }

    /// Abandon a fetch whose request failed: clears the loading flag
    /// without touching any record state. Stale tokens are ignored.
    pub fn abort_load(&mut self, token: LoadToken) {
        if self.revisions.get(&token.key).copied() == Some(token.revision) {
            self.loading.remove(&token.key);
        }
    }

    /// Replace the working record with `f(current)`. Never touches
    /// committed state; dirtiness and the pending payload are recomputed in
    /// the same call.
    pub fn update(&mut self, key: WeekKey, f: impl FnOnce(WeekRecord) -> WeekRecord) {
        let updated = f(self.get(key));
        self.working.insert(key, updated);
        self.recompute(key);
    }

    /// Record a successful backend write: working becomes the new committed
    /// state, pending is cleared, and in-flight loads are invalidated.
    pub fn mark_saved(&mut self, key: WeekKey) {
        let record = self.get(key);
        self.working.insert(key, record.clone());
        self.committed.insert(key, record);
        self.bump(key);
        self.loading.remove(&key);
        self.recompute(key);
    }

    #[must_use]
    pub fn is_dirty(&self, key: WeekKey) -> bool {
        match (self.working.get(&key), self.committed.get(&key)) {
            (Some(working), Some(committed)) => working.normalize() != committed.normalize(),
            (Some(working), None) => !working.is_default(),
            (None, _) => false,
        }
    }

    #[must_use]
    pub fn state(&self, key: WeekKey) -> WeekState {
        if self.loading.contains(&key) {
            WeekState::Loading
        } else if !self.working.contains_key(&key) {
            WeekState::Unloaded
        } else if self.is_dirty(key) {
            WeekState::Dirty
        } else {
            WeekState::Clean
        }
    }

    #[must_use]
    pub fn pending(&self, key: WeekKey) -> Option<&WeekRecord> {
        self.pending.get(&key)
    }

    /// Remove and return the pending payload. The cache is cleared whether
    /// or not the caller's write ends up succeeding.
    pub fn take_pending(&mut self, key: WeekKey) -> Option<WeekRecord> {
        self.pending.remove(&key)
    }

    #[must_use]
    pub fn dirty_keys(&self) -> Vec<WeekKey> {
        let mut keys: Vec<WeekKey> = self
            .working
            .keys()
            .copied()
            .filter(|key| self.is_dirty(*key))
            .collect();
        keys.sort();
        keys
    }

    fn install(&mut self, key: WeekKey, record: Option<WeekRecord>) {
        let record = record.unwrap_or_default();
        self.working.insert(key, record.clone());
        self.committed.insert(key, record);
        self.pending.remove(&key);
        self.loading.remove(&key);
    }

    fn bump(&mut self, key: WeekKey) -> u64 {
        let revision = self.revisions.entry(key).or_insert(0);
        *revision += 1;
        *revision
    }

    fn recompute(&mut self, key: WeekKey) {
        if self.is_dirty(key) {
            let record = self.get(key);
            self.pending.insert(key, record);
        } else {
            self.pending.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Event;
    use chrono::NaiveDate;

    fn key() -> WeekKey {
        WeekKey::parse("2024-06-02").unwrap()
    }

    fn record_with_habit(name: &str) -> WeekRecord {
        let mut record = WeekRecord::default();
        record.habits.trackers.push(name.to_string());
        record
            .habits
            .completed
            .insert(name.to_string(), [false; 7]);
        record
    }

    #[test]
    fn test_unloaded_key_is_clean_and_empty() {
        let store = WeekStore::new();
        assert_eq!(store.get(key()), WeekRecord::default());
        assert!(!store.is_dirty(key()));
        assert_eq!(store.state(key()), WeekState::Unloaded);
    }

    #[test]
    fn test_clean_after_load() {
        let mut store = WeekStore::new();
        store.load(key(), Some(record_with_habit("Run")));
        assert!(!store.is_dirty(key()));
        assert_eq!(store.state(key()), WeekState::Clean);
        assert_eq!(store.get(key()).habits.trackers, vec!["Run"]);
    }

    #[test]
    fn test_load_missing_row_installs_default() {
        let mut store = WeekStore::new();
        store.load(key(), None);
        assert_eq!(store.get(key()), WeekRecord::default());
        assert_eq!(store.state(key()), WeekState::Clean);
    }

    #[test]
    fn test_update_marks_dirty_and_leaves_committed() {
        let mut store = WeekStore::new();
        store.load(key(), None);
        store.update(key(), |mut record| {
            record.moods[2] = 4;
            record
        });

        assert!(store.is_dirty(key()));
        assert_eq!(store.state(key()), WeekState::Dirty);
        assert_eq!(store.committed(key()).unwrap().moods[2], 0);
        assert_eq!(store.get(key()).moods[2], 4);
    }

    #[test]
    fn test_noop_update_stays_clean() {
        let mut store = WeekStore::new();
        store.load(key(), Some(record_with_habit("Run")));
        store.update(key(), |record| record);
        assert!(!store.is_dirty(key()));
        assert!(store.pending(key()).is_none());
    }

    #[test]
    fn test_dirty_survives_recomputation_until_save() {
        let mut store = WeekStore::new();
        store.load(key(), None);
        store.update(key(), |mut record| {
            record.grateful = "sunshine".to_string();
            record
        });
        assert!(store.is_dirty(key()));
        // Repeated no-op recomputation must not flip the signal
        store.update(key(), |record| record);
        assert!(store.is_dirty(key()));

        store.mark_saved(key());
        assert!(!store.is_dirty(key()));
        assert_eq!(store.committed(key()).unwrap().grateful, "sunshine");
        assert!(store.pending(key()).is_none());
    }

    #[test]
    fn test_revert_clears_dirty_and_pending() {
        let mut store = WeekStore::new();
        store.load(key(), Some(record_with_habit("Run")));
        store.update(key(), |mut record| {
            record.comment = "rough week".to_string();
            record
        });
        assert!(store.pending(key()).is_some());

        store.update(key(), |mut record| {
            record.comment = String::new();
            record
        });
        assert!(!store.is_dirty(key()));
        assert!(store.pending(key()).is_none());
    }

    #[test]
    fn test_unsaved_default_record_is_not_dirty() {
        let mut store = WeekStore::new();
        // Never loaded: an update that produces default content is not a change
        store.update(key(), |record| record);
        assert!(!store.is_dirty(key()));

        store.update(key(), |mut record| {
            record.moods[0] = 5;
            record
        });
        assert!(store.is_dirty(key()));
    }

    #[test]
    fn test_representation_slop_is_not_dirty() {
        // Committed row decoded with a timestamp event date vs. a working
        // copy holding the same date must compare clean.
        let committed: WeekRecord = serde_json::from_str(
            r#"{"events": [{"id": "e1", "date": "2024-06-03T00:00:00Z", "text": "trip"}]}"#,
        )
        .unwrap();

        let mut store = WeekStore::new();
        store.load(key(), Some(committed));
        store.update(key(), |mut record| {
            record.events = vec![Event {
                id: "e1".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                text: "trip".to_string(),
            }];
            record
        });
        assert!(!store.is_dirty(key()));
    }

    #[test]
    fn test_stale_load_after_save_is_dropped() {
        let mut store = WeekStore::new();
        store.load(key(), None);

        // Fetch begins, then the user edits and saves before it resolves
        let token = store.begin_load(key());
        store.update(key(), |mut record| {
            record.grateful = "coffee".to_string();
            record
        });
        store.mark_saved(key());

        // The stale response must not clobber the saved edit
        assert!(!store.apply_load(token, Some(WeekRecord::default())));
        assert_eq!(store.get(key()).grateful, "coffee");
        assert_eq!(store.committed(key()).unwrap().grateful, "coffee");
    }

    #[test]
    fn test_newer_load_wins_over_older() {
        let mut store = WeekStore::new();
        let stale = store.begin_load(key());
        let fresh = store.begin_load(key());

        assert!(store.apply_load(fresh, Some(record_with_habit("Run"))));
        assert!(!store.apply_load(stale, None));
        assert_eq!(store.get(key()).habits.trackers, vec!["Run"]);
    }

    #[test]
    fn test_loading_state() {
        let mut store = WeekStore::new();
        let token = store.begin_load(key());
        assert_eq!(store.state(key()), WeekState::Loading);
        assert!(store.apply_load(token, None));
        assert_eq!(store.state(key()), WeekState::Clean);
    }

    #[test]
    fn test_abort_load_clears_loading_only() {
        let mut store = WeekStore::new();
        store.load(key(), Some(record_with_habit("Run")));
        store.update(key(), |mut record| {
            record.comment = "keep me".to_string();
            record
        });

        let token = store.begin_load(key());
        assert_eq!(store.state(key()), WeekState::Loading);
        store.abort_load(token);

        // Record state untouched, dirtiness re-derived
        assert_eq!(store.state(key()), WeekState::Dirty);
        assert_eq!(store.get(key()).comment, "keep me");
    }

    #[test]
    fn test_keys_are_independent() {
        let mut store = WeekStore::new();
        let other = key().next();
        store.load(key(), None);
        store.load(other, None);

        store.update(key(), |mut record| {
            record.moods[1] = 2;
            record
        });
        assert!(store.is_dirty(key()));
        assert!(!store.is_dirty(other));
        assert_eq!(store.dirty_keys(), vec![key()]);
    }

    #[test]
    fn test_take_pending_clears_cache() {
        let mut store = WeekStore::new();
        store.load(key(), None);
        store.update(key(), |mut record| {
            record.comment = "note".to_string();
            record
        });

        let payload = store.take_pending(key()).unwrap();
        assert_eq!(payload.comment, "note");
        assert!(store.pending(key()).is_none());
        // Still dirty: taking the payload is optimistic, not a save
        assert!(store.is_dirty(key()));
    }
}
