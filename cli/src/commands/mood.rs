use anyhow::{Context, Result};
use chrono::NaiveDate;

use sevenday_core::service::JournalService;
use sevenday_core::week::WeekKey;

use super::helpers::mood_label;
use super::print_saved_record;

pub(crate) fn cmd_mood(
    svc: &mut JournalService,
    date: NaiveDate,
    score: u8,
    json: bool,
) -> Result<()> {
    let slot = WeekKey::for_date(date)
        .day_slot(date)
        .context("Date is outside its own week")?;

    svc.activate(date)?;
    let stored = svc.set_mood(slot, score)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else if stored == 0 {
        println!("Cleared mood for {}", date.format("%a %b %-d"));
    } else {
        println!(
            "Mood for {} set to {stored} ({})",
            date.format("%a %b %-d"),
            mood_label(stored)
        );
    }
    Ok(())
}
