use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};

use sevenday_core::service::JournalService;

use super::helpers::{parse_date, parse_day};
use super::show::cmd_show;

const HELP: &str = "\
Commands:
  show                         redraw the current week
  habit add <name>             start tracking a habit
  habit done <name> <day>      toggle a habit for a day (name or 0-6)
  habit rm <name>              stop tracking a habit
  mood <day> <score>           set mood 1-6 (same score clears)
  meal <day> <field> <text>    log breakfast/lunch/dinner/extra
  event <date> <text>          add an event (YYYY-MM-DD, this week)
  grateful <text>              set the gratitude note
  comment <text>               set the weekly comment
  next | prev | goto <date>    change week (pending edits auto-save)
  save                         save the current week
  refresh                      discard edits, reload from storage
  quit                         leave the review";

/// Interactive multi-week editing session. Edits stay local until `save`,
/// an auto-save on week navigation, or an explicit decision at quit time.
pub(crate) fn cmd_review(svc: &mut JournalService, date: NaiveDate) -> Result<()> {
    let mut current = date;
    svc.activate(current)?;
    cmd_show(svc, current, false)?;
    eprintln!("\nType 'help' for commands.");

    let stdin = io::stdin();
    loop {
        let marker = if svc.is_dirty() { " *" } else { "" };
        eprint!("[{}{marker}] > ", svc.active().map_or_else(String::new, |k| k.to_string()));
        io::stderr().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();

        let outcome = match command {
            "help" => {
                eprintln!("{HELP}");
                Ok(())
            }
            "show" => cmd_show(svc, current, false),
            "habit" => run_habit(svc, &rest),
            "mood" => run_mood(svc, &rest),
            "meal" => run_meal(svc, &rest),
            "event" => run_event(svc, &rest),
            "grateful" => svc.set_grateful(rest.join(" ")),
            "comment" => svc.set_comment(rest.join(" ")),
            "next" => {
                current = current + Duration::days(7);
                svc.activate(current).map(|_| ())
            }
            "prev" => {
                current = current - Duration::days(7);
                svc.activate(current).map(|_| ())
            }
            "goto" => match parse_date(rest.first().map(ToString::to_string)) {
                Ok(date) => {
                    current = date;
                    svc.activate(current).map(|_| ())
                }
                Err(err) => Err(err),
            },
            "save" => svc.save_now().map(|()| {
                eprintln!("Saved.");
            }),
            "refresh" => svc.refresh().map(|()| {
                eprintln!("Reloaded from storage.");
            }),
            "quit" | "q" | "exit" => {
                if confirm_quit(svc, &stdin)? {
                    break;
                }
                Ok(())
            }
            other => {
                eprintln!("Unknown command '{other}'. Type 'help' for commands.");
                Ok(())
            }
        };

        if let Err(err) = outcome {
            eprintln!("Error: {err:#}");
        }
    }

    Ok(())
}

fn run_habit(svc: &mut JournalService, args: &[&str]) -> Result<()> {
    match args {
        ["add", name @ ..] if !name.is_empty() => svc.add_habit(&name.join(" ")),
        ["done", name, day] => {
            let slot = parse_day(day)?;
            let now_done = svc.toggle_habit(name, slot)?;
            eprintln!("{}", if now_done { "Done." } else { "Cleared." });
            Ok(())
        }
        ["rm", name @ ..] if !name.is_empty() => svc.remove_habit(&name.join(" ")),
        _ => {
            eprintln!("Usage: habit add <name> | habit done <name> <day> | habit rm <name>");
            Ok(())
        }
    }
}

fn run_mood(svc: &mut JournalService, args: &[&str]) -> Result<()> {
    let [day, score] = args else {
        eprintln!("Usage: mood <day> <score 1-6>");
        return Ok(());
    };
    let slot = parse_day(day)?;
    let score: u8 = score.parse().context("Score must be a number 1-6")?;
    svc.set_mood(slot, score)?;
    Ok(())
}

fn run_meal(svc: &mut JournalService, args: &[&str]) -> Result<()> {
    let [day, field, text @ ..] = args else {
        eprintln!("Usage: meal <day> <breakfast|lunch|dinner|extra> <text>");
        return Ok(());
    };
    let slot = parse_day(day)?;
    svc.set_meal(slot, field, text.join(" "))
}

fn run_event(svc: &mut JournalService, args: &[&str]) -> Result<()> {
    let [date, text @ ..] = args else {
        eprintln!("Usage: event <YYYY-MM-DD> <text>");
        return Ok(());
    };
    if text.is_empty() {
        eprintln!("Usage: event <YYYY-MM-DD> <text>");
        return Ok(());
    }
    let date = parse_date(Some((*date).to_string()))?;
    svc.add_event(date, &text.join(" "))?;
    Ok(())
}

/// Advisory exit guard: unsaved changes prompt for a decision, they are
/// never silently flushed.
fn confirm_quit(svc: &mut JournalService, stdin: &io::Stdin) -> Result<bool> {
    if !svc.has_unsaved_changes() {
        return Ok(true);
    }

    eprint!("Unsaved changes. Save before quitting? [y = save / n = discard / c = cancel] ");
    io::stderr().flush()?;
    let answer = stdin
        .lock()
        .lines()
        .next()
        .transpose()
        .context("Failed to read input")?
        .unwrap_or_default();

    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => {
            svc.save_now()?;
            eprintln!("Saved.");
            Ok(true)
        }
        "n" | "no" => Ok(true),
        _ => Ok(false),
    }
}
