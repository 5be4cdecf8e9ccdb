use anyhow::Result;
use serde::Serialize;

use crate::models::WeekRecord;
use crate::service::WeekBackend;
use crate::week::WeekKey;

/// Aggregates for one week of journal data.
#[derive(Debug, Clone, Serialize)]
pub struct WeekStats {
    pub week: WeekKey,
    /// Mean of the set mood scores (unset days are ignored); None when no
    /// day has a mood.
    pub mood_average: Option<f64>,
    /// Completed slots as a percentage of trackers × 7; 0 with no trackers.
    pub habit_completion: f64,
    /// Longest run of consecutive completed days on any single habit.
    pub longest_streak: u32,
}

#[must_use]
pub fn mood_average(record: &WeekRecord) -> Option<f64> {
    let set: Vec<u8> = record.moods.iter().copied().filter(|m| *m > 0).collect();
    if set.is_empty() {
        return None;
    }
    let sum: u32 = set.iter().map(|m| u32::from(*m)).sum();
    Some(f64::from(sum) / set.len() as f64)
}

#[must_use]
pub fn habit_completion(record: &WeekRecord) -> f64 {
    let trackers = &record.habits.trackers;
    if trackers.is_empty() {
        return 0.0;
    }

    let completed: usize = trackers
        .iter()
        .map(|name| {
            record
                .habits
                .completed
                .get(name)
                .map_or(0, |days| days.iter().filter(|d| **d).count())
        })
        .sum();
    let possible = trackers.len() * 7;

    completed as f64 / possible as f64 * 100.0
}

#[must_use]
pub fn longest_streak(record: &WeekRecord) -> u32 {
    let mut longest = 0u32;
    for name in &record.habits.trackers {
        let Some(days) = record.habits.completed.get(name) else {
            continue;
        };
        let mut run = 0u32;
        for done in days {
            if *done {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
    }
    longest
}

#[must_use]
pub fn week_stats(week: WeekKey, record: &WeekRecord) -> WeekStats {
    WeekStats {
        week,
        mood_average: mood_average(record),
        habit_completion: habit_completion(record),
        longest_streak: longest_streak(record),
    }
}

/// Stats for the user's most recent `limit` stored weeks, newest first.
pub fn week_trends(
    backend: &dyn WeekBackend,
    user_id: &str,
    limit: usize,
) -> Result<Vec<WeekStats>> {
    let mut keys = backend.list_week_keys(user_id)?;
    keys.truncate(limit);
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let rows = backend.fetch_many(user_id, &keys)?;
    Ok(rows
        .iter()
        .map(|(week, record)| week_stats(*week, record))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MemoryBackend;

    fn record_with_completed(days: [bool; 7]) -> WeekRecord {
        let mut record = WeekRecord::default();
        record.habits.trackers.push("Run".to_string());
        record.habits.completed.insert("Run".to_string(), days);
        record
    }

    #[test]
    fn test_mood_average_ignores_unset_days() {
        let mut record = WeekRecord::default();
        assert_eq!(mood_average(&record), None);

        record.moods = [0, 4, 0, 6, 0, 0, 0];
        let avg = mood_average(&record).unwrap();
        assert!((avg - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_habit_completion_percentage() {
        let record = WeekRecord::default();
        assert!((habit_completion(&record) - 0.0).abs() < f64::EPSILON);

        let mut record = record_with_completed([true, true, false, false, false, false, false]);
        record.habits.trackers.push("Read".to_string());
        record
            .habits
            .completed
            .insert("Read".to_string(), [true, false, false, false, false, false, false]);

        // 3 of 14 slots
        let pct = habit_completion(&record);
        assert!((pct - 3.0 / 14.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_habit_completion_ignores_orphan_rows() {
        let mut record = WeekRecord::default();
        record
            .habits
            .completed
            .insert("Ghost".to_string(), [true; 7]);
        assert!((habit_completion(&record) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_longest_streak_within_week() {
        let record = record_with_completed([true, true, false, true, true, true, false]);
        assert_eq!(longest_streak(&record), 3);

        let record = record_with_completed([false; 7]);
        assert_eq!(longest_streak(&record), 0);

        let record = record_with_completed([true; 7]);
        assert_eq!(longest_streak(&record), 7);
    }

    #[test]
    fn test_longest_streak_across_habits() {
        let mut record = record_with_completed([true, false, true, false, true, false, true]);
        record.habits.trackers.push("Read".to_string());
        record.habits.completed.insert(
            "Read".to_string(),
            [false, true, true, true, false, false, false],
        );
        assert_eq!(longest_streak(&record), 3);
    }

    #[test]
    fn test_week_trends_newest_first() {
        let backend = MemoryBackend::new();
        let older = WeekKey::parse("2024-05-26").unwrap();
        let newer = WeekKey::parse("2024-06-02").unwrap();

        let mut a = WeekRecord::default();
        a.moods = [3, 0, 0, 0, 0, 0, 0];
        backend.upsert("alice", older, &a).unwrap();
        backend
            .upsert(
                "alice",
                newer,
                &record_with_completed([true, true, true, false, false, false, false]),
            )
            .unwrap();

        let trends = week_trends(&backend, "alice", 8).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].week, newer);
        assert_eq!(trends[0].longest_streak, 3);
        assert_eq!(trends[1].week, older);
        assert_eq!(trends[1].mood_average, Some(3.0));
    }

    #[test]
    fn test_week_trends_respects_limit() {
        let backend = MemoryBackend::new();
        let mut week = WeekKey::parse("2024-06-02").unwrap();
        for _ in 0..5 {
            backend.upsert("alice", week, &WeekRecord::default()).unwrap();
            week = week.prev();
        }

        let trends = week_trends(&backend, "alice", 3).unwrap();
        assert_eq!(trends.len(), 3);
        assert_eq!(trends[0].week.to_string(), "2024-06-02");
    }

    #[test]
    fn test_week_trends_empty_journal() {
        let backend = MemoryBackend::new();
        assert!(week_trends(&backend, "alice", 8).unwrap().is_empty());
    }
}
