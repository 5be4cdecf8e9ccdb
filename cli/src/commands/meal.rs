use anyhow::{Context, Result};
use chrono::NaiveDate;

use sevenday_core::service::JournalService;
use sevenday_core::week::WeekKey;

use super::print_saved_record;

pub(crate) fn cmd_meal(
    svc: &mut JournalService,
    date: NaiveDate,
    field: &str,
    text: &str,
    json: bool,
) -> Result<()> {
    let slot = WeekKey::for_date(date)
        .day_slot(date)
        .context("Date is outside its own week")?;

    svc.activate(date)?;
    svc.set_meal(slot, field, text.to_string())?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else if text.trim().is_empty() {
        println!(
            "Cleared {} for {}",
            field.to_lowercase(),
            date.format("%a %b %-d")
        );
    } else {
        println!(
            "Logged {} for {}: {text}",
            field.to_lowercase(),
            date.format("%a %b %-d")
        );
    }
    Ok(())
}
