use anyhow::Result;

use sevenday_core::prefs::{PreferenceStore, load_week_start, store_week_start};

pub(crate) fn cmd_week_start(
    prefs: &dyn PreferenceStore,
    user_id: &str,
    value: Option<String>,
) -> Result<()> {
    match value {
        None => {
            println!("{}", load_week_start(prefs, user_id));
        }
        Some(raw) => {
            let day = raw.parse()?;
            store_week_start(prefs, user_id, day)?;
            println!("Week start set to {day}");
            // Display-only: existing entries keep their Sunday-anchored keys
            eprintln!("Note: this changes how weeks are displayed, not how they are stored.");
        }
    }
    Ok(())
}
