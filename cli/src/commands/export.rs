use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use sevenday_core::export::{export_all, write_csv};
use sevenday_core::service::WeekBackend;

pub(crate) fn cmd_export(
    backend: &dyn WeekBackend,
    user_id: &str,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let data = export_all(backend, user_id)?;

    let rendered = match format.to_lowercase().as_str() {
        "json" => serde_json::to_string_pretty(&data)?,
        "csv" => {
            let mut out = Vec::new();
            write_csv(&data, &mut out)?;
            String::from_utf8(out).context("CSV output was not valid UTF-8")?
        }
        other => bail!("Unknown export format '{other}'. Use 'json' or 'csv'"),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} weeks to {}", data.weeks.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
