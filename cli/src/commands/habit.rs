use anyhow::{Context, Result};
use chrono::NaiveDate;

use sevenday_core::service::JournalService;
use sevenday_core::week::WeekKey;

use super::helpers::{DAY_FULL, parse_day};
use super::print_saved_record;

pub(crate) fn cmd_habit_add(
    svc: &mut JournalService,
    date: NaiveDate,
    name: &str,
    json: bool,
) -> Result<()> {
    let week = svc.activate(date)?;
    svc.add_habit(name)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else {
        println!("Added habit '{}' for week {week}", name.trim());
    }
    Ok(())
}

pub(crate) fn cmd_habit_done(
    svc: &mut JournalService,
    date: NaiveDate,
    name: &str,
    day: Option<String>,
    json: bool,
) -> Result<()> {
    let slot = match day {
        Some(day) => parse_day(&day)?,
        None => WeekKey::for_date(date)
            .day_slot(date)
            .context("Date is outside its own week")?,
    };

    svc.activate(date)?;
    let now_done = svc.toggle_habit(name, slot)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else if now_done {
        println!("Marked '{name}' done for {}", DAY_FULL[slot]);
    } else {
        println!("Cleared '{name}' for {}", DAY_FULL[slot]);
    }
    Ok(())
}

pub(crate) fn cmd_habit_remove(
    svc: &mut JournalService,
    date: NaiveDate,
    name: &str,
    json: bool,
) -> Result<()> {
    let week = svc.activate(date)?;
    svc.remove_habit(name)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else {
        println!("Removed habit '{name}' from week {week}");
    }
    Ok(())
}

pub(crate) fn cmd_habit_rename(
    svc: &mut JournalService,
    date: NaiveDate,
    old: &str,
    new: &str,
    json: bool,
) -> Result<()> {
    svc.activate(date)?;
    svc.rename_habit(old, new)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else {
        println!("Renamed habit '{old}' to '{}'", new.trim());
    }
    Ok(())
}

pub(crate) fn cmd_habit_move(
    svc: &mut JournalService,
    date: NaiveDate,
    from: usize,
    to: usize,
    json: bool,
) -> Result<()> {
    svc.activate(date)?;
    svc.move_habit(from, to)?;
    svc.save_now()?;

    if json {
        print_saved_record(svc)?;
    } else {
        println!("Moved habit from position {from} to {to}");
    }
    Ok(())
}
