use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use sevenday_core::service::WeekBackend;
use sevenday_core::stats::week_trends;

use super::helpers::json_error;

pub(crate) fn cmd_stats(
    backend: &dyn WeekBackend,
    user_id: &str,
    weeks: usize,
    json: bool,
) -> Result<()> {
    let trends = week_trends(backend, user_id, weeks)?;

    if trends.is_empty() {
        if json {
            println!("{}", json_error("No weeks recorded yet"));
        } else {
            eprintln!("No weeks recorded yet");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&trends)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct StatsRow {
        #[tabled(rename = "Week")]
        week: String,
        #[tabled(rename = "Mood avg")]
        mood: String,
        #[tabled(rename = "Habits")]
        habits: String,
        #[tabled(rename = "Best streak")]
        streak: String,
    }

    let rows: Vec<StatsRow> = trends
        .iter()
        .map(|stat| StatsRow {
            week: stat.week.to_string(),
            mood: stat
                .mood_average
                .map_or("-".to_string(), |avg| format!("{avg:.1}")),
            habits: format!("{:.0}%", stat.habit_completion),
            streak: if stat.longest_streak == 0 {
                "-".to_string()
            } else {
                format!("{}d", stat.longest_streak)
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
