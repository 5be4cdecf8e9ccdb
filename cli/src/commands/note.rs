use anyhow::Result;
use chrono::NaiveDate;

use sevenday_core::service::JournalService;

use super::print_saved_record;

pub(crate) fn cmd_grateful(
    svc: &mut JournalService,
    date: NaiveDate,
    text: &str,
    json: bool,
) -> Result<()> {
    let week = svc.activate(date)?;
    svc.set_grateful(text.to_string())?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else if text.trim().is_empty() {
        println!("Cleared gratitude note for week {week}");
    } else {
        println!("Saved gratitude note for week {week}");
    }
    Ok(())
}

pub(crate) fn cmd_comment(
    svc: &mut JournalService,
    date: NaiveDate,
    text: &str,
    json: bool,
) -> Result<()> {
    let week = svc.activate(date)?;
    svc.set_comment(text.to_string())?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else if text.trim().is_empty() {
        println!("Cleared weekly comment for week {week}");
    } else {
        println!("Saved weekly comment for week {week}");
    }
    Ok(())
}
