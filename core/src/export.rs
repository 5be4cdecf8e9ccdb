use std::io::Write;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::models::WeekRecord;
use crate::service::WeekBackend;
use crate::stats;
use crate::week::WeekKey;

pub const EXPORT_VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportWeek {
    pub week_start: WeekKey,
    pub record: WeekRecord,
}

/// Full journal export for one user, newest week first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    pub user_id: String,
    pub weeks: Vec<ExportWeek>,
}

pub fn export_all(backend: &dyn WeekBackend, user_id: &str) -> Result<ExportData> {
    let keys = backend.list_week_keys(user_id)?;
    let rows = backend.fetch_many(user_id, &keys)?;

    Ok(ExportData {
        version: EXPORT_VERSION,
        exported_at: Local::now().to_rfc3339(),
        user_id: user_id.to_string(),
        weeks: rows
            .into_iter()
            .map(|(week_start, record)| ExportWeek { week_start, record })
            .collect(),
    })
}

/// Per-week summary rows: week range, mood average, habit completion,
/// streak, and section sizes.
pub fn write_csv<W: Write>(data: &ExportData, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "week_start",
        "week_end",
        "mood_average",
        "habit_completion_pct",
        "longest_streak",
        "habits",
        "events",
    ])
    .context("Failed to write CSV header")?;

    for week in &data.weeks {
        let stats = stats::week_stats(week.week_start, &week.record);
        csv.write_record([
            week.week_start.to_string(),
            week.week_start.end().format("%Y-%m-%d").to_string(),
            stats
                .mood_average
                .map(|avg| format!("{avg:.2}"))
                .unwrap_or_default(),
            format!("{:.1}", stats.habit_completion),
            stats.longest_streak.to_string(),
            week.record.habits.trackers.len().to_string(),
            week.record.events.len().to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}
