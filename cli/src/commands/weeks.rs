use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::Style,
};

use sevenday_core::service::WeekBackend;

use super::helpers::format_week_range;

pub(crate) fn cmd_weeks(backend: &dyn WeekBackend, user_id: &str, json: bool) -> Result<()> {
    let keys = backend.list_week_keys(user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
        return Ok(());
    }

    if keys.is_empty() {
        println!("No weeks recorded yet.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct WeekRow {
        #[tabled(rename = "Week")]
        week: String,
        #[tabled(rename = "Range")]
        range: String,
    }

    let rows: Vec<WeekRow> = keys
        .iter()
        .map(|key| WeekRow {
            week: key.to_string(),
            range: format_week_range(*key),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
