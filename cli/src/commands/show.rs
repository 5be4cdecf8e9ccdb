use anyhow::Result;
use chrono::NaiveDate;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use sevenday_core::models::WeekRecord;
use sevenday_core::service::JournalService;
use sevenday_core::stats;
use sevenday_core::week::{WeekKey, week_start};

use super::helpers::{DAY_FULL, DAY_SHORT, display_slots, mood_label, truncate};

pub(crate) fn cmd_show(svc: &mut JournalService, date: NaiveDate, json: bool) -> Result<()> {
    let week = svc.activate(date)?;
    let record = svc.record();

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    // The displayed range follows the week-start preference; the storage
    // key stays Sunday-anchored.
    let shown_start = week_start(date, svc.start_day());
    let shown_end = shown_start + chrono::Duration::days(6);
    println!(
        "Week {week} ({} - {})",
        shown_start.format("%b %-d"),
        shown_end.format("%b %-d, %Y")
    );
    print_habits(svc, &record);
    print_moods(svc, &record);
    print_meals(svc, week, &record);
    print_events(&record);

    if !record.grateful.trim().is_empty() {
        println!("\nGrateful for: {}", record.grateful);
    }
    if !record.comment.trim().is_empty() {
        println!("\nComment: {}", record.comment);
    }

    let week_stats = stats::week_stats(week, &record);
    if let Some(avg) = week_stats.mood_average {
        print!("\nMood avg {avg:.1}");
        if !record.habits.trackers.is_empty() {
            print!(" | habits {:.0}%", week_stats.habit_completion);
        }
        println!();
    } else if !record.habits.trackers.is_empty() {
        println!("\nHabits {:.0}%", week_stats.habit_completion);
    }

    Ok(())
}

fn print_habits(svc: &JournalService, record: &WeekRecord) {
    if record.habits.trackers.is_empty() {
        return;
    }

    #[derive(Tabled)]
    struct HabitRow {
        #[tabled(rename = "Habit")]
        name: String,
        #[tabled(rename = "D1")]
        d1: &'static str,
        #[tabled(rename = "D2")]
        d2: &'static str,
        #[tabled(rename = "D3")]
        d3: &'static str,
        #[tabled(rename = "D4")]
        d4: &'static str,
        #[tabled(rename = "D5")]
        d5: &'static str,
        #[tabled(rename = "D6")]
        d6: &'static str,
        #[tabled(rename = "D7")]
        d7: &'static str,
    }

    let order = display_slots(svc.start_day());
    let mark = |done: bool| if done { "x" } else { "." };

    let rows: Vec<HabitRow> = record
        .habits
        .trackers
        .iter()
        .map(|name| {
            let days = record
                .habits
                .completed
                .get(name)
                .copied()
                .unwrap_or([false; 7]);
            HabitRow {
                name: truncate(name, 24),
                d1: mark(days[order[0]]),
                d2: mark(days[order[1]]),
                d3: mark(days[order[2]]),
                d4: mark(days[order[3]]),
                d5: mark(days[order[4]]),
                d6: mark(days[order[5]]),
                d7: mark(days[order[6]]),
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..8)).with(Alignment::center()));
    let mut rendered = table.to_string();

    // Swap the generic D1-D7 headers for day names in display order
    for (i, slot) in order.iter().enumerate() {
        rendered = rendered.replace(&format!("D{}", i + 1), DAY_SHORT[*slot]);
    }
    println!("\n{rendered}");
}

fn print_moods(svc: &JournalService, record: &WeekRecord) {
    if record.moods.iter().all(|m| *m == 0) {
        return;
    }

    println!("\nMoods:");
    for slot in display_slots(svc.start_day()) {
        let score = record.moods[slot];
        if score > 0 {
            println!("  {:<9} {} ({})", DAY_FULL[slot], score, mood_label(score));
        }
    }
}

fn print_meals(svc: &JournalService, week: WeekKey, record: &WeekRecord) {
    let has_meals = record.meals.values().any(|day| !day.is_empty());
    if !has_meals {
        return;
    }

    println!("\nMeals:");
    for slot in display_slots(svc.start_day()) {
        let Some(day) = record.meals.get(&(slot as u8)) else {
            continue;
        };
        if day.is_empty() {
            continue;
        }

        let date = week.dates()[slot];
        let mut parts = Vec::new();
        for (label, text) in [
            ("breakfast", &day.breakfast),
            ("lunch", &day.lunch),
            ("dinner", &day.dinner),
            ("extra", &day.extra),
        ] {
            if !text.trim().is_empty() {
                parts.push(format!("{label}: {text}"));
            }
        }
        println!(
            "  {:<9} {}  {}",
            DAY_FULL[slot],
            date.format("%b %-d"),
            parts.join(" | ")
        );
    }
}

fn print_events(record: &WeekRecord) {
    if record.events.is_empty() {
        return;
    }

    println!("\nEvents:");
    for event in &record.events {
        println!("  {}  {}", event.date.format("%b %-d"), event.text);
    }
}
