mod event;
mod export;
mod habit;
mod helpers;
mod meal;
mod mood;
mod note;
mod prefs;
mod review;
mod show;
mod stats;
mod weeks;

use anyhow::Result;

use sevenday_core::service::JournalService;

pub(crate) use event::{cmd_event_add, cmd_event_remove};
pub(crate) use export::cmd_export;
pub(crate) use habit::{
    cmd_habit_add, cmd_habit_done, cmd_habit_move, cmd_habit_remove, cmd_habit_rename,
};
pub(crate) use helpers::parse_date;
pub(crate) use meal::cmd_meal;
pub(crate) use mood::cmd_mood;
pub(crate) use note::{cmd_comment, cmd_grateful};
pub(crate) use prefs::cmd_week_start;
pub(crate) use review::cmd_review;
pub(crate) use show::cmd_show;
pub(crate) use stats::cmd_stats;
pub(crate) use weeks::cmd_weeks;

/// Print the active week's just-saved record for `--json` callers.
pub(super) fn print_saved_record(svc: &JournalService) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&svc.record())?);
    Ok(())
}
