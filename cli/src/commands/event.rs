use anyhow::Result;
use chrono::NaiveDate;

use sevenday_core::service::JournalService;

use super::print_saved_record;

pub(crate) fn cmd_event_add(
    svc: &mut JournalService,
    date: NaiveDate,
    text: &str,
    json: bool,
) -> Result<()> {
    svc.activate(date)?;
    let event = svc.add_event(date, text)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else {
        println!(
            "Added event for {}: {} (id {})",
            date.format("%a %b %-d"),
            event.text,
            event.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_event_remove(
    svc: &mut JournalService,
    date: NaiveDate,
    id: &str,
    json: bool,
) -> Result<()> {
    let week = svc.activate(date)?;
    svc.remove_event(id)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else {
        println!("Removed event {id} from week {week}");
    }
    Ok(())
}
