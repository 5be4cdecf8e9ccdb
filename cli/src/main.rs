mod commands;
mod config;
mod remote;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_comment, cmd_event_add, cmd_event_remove, cmd_export, cmd_grateful, cmd_habit_add,
    cmd_habit_done, cmd_habit_move, cmd_habit_remove, cmd_habit_rename, cmd_meal, cmd_mood,
    cmd_review, cmd_show, cmd_stats, cmd_week_start, cmd_weeks, parse_date,
};
use crate::config::Config;
use crate::remote::RemoteClient;
use sevenday_core::db::LocalBackend;
use sevenday_core::prefs::{self, MemoryPrefs, PreferenceStore};
use sevenday_core::service::{JournalService, WeekBackend};

#[derive(Parser)]
#[command(
    name = "sevenday",
    version,
    about = "A simple weekly journal CLI",
    long_about = "\n
  ┌─┐┌─┐┬  ┬┌─┐┌┐┌┌┬┐┌─┐┬ ┬
  └─┐├┤ └┐┌┘├┤ │││ ││├─┤└┬┘
  └─┘└─┘ └┘ └─┘┘└┘─┴┘┴ ┴ ┴
     seven days, one page.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a week's journal (defaults to this week)
    Show {
        /// Any date inside the week (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage habit trackers
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },
    /// Set the mood for a day (1-6; setting the same score clears it)
    Mood {
        /// Mood score 1-6
        score: u8,
        /// Day to set (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a meal note for a day
    Meal {
        /// Meal field: breakfast, lunch, dinner, extra
        field: String,
        /// What you ate (empty text clears the field)
        text: String,
        /// Day to log (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the week's notable events (at most 3)
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Set the week's gratitude note
    Grateful {
        /// The note (empty text clears it)
        text: String,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the comment of the week
    Comment {
        /// The comment (empty text clears it)
        text: String,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded weeks, newest first
    Weeks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show mood and habit trends across recent weeks
    Stats {
        /// Number of weeks to include
        #[arg(short, long, default_value = "8")]
        weeks: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the journal as JSON or a CSV summary
    Export {
        /// Export format: json or csv
        #[arg(long, default_value = "json")]
        format: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive week-by-week editing session
    Review {
        /// Week to start on (default: this week)
        date: Option<String>,
    },
    /// Get or set the displayed week start (sunday or monday)
    WeekStart {
        /// New value; omit to print the current preference
        value: Option<String>,
    },
    /// Start the journal REST server backed by the local database
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Start tracking a habit this week
    Add {
        /// Habit name
        name: String,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a habit's completion for a day
    Done {
        /// Habit name
        name: String,
        /// Day to toggle (name or 0-6; default: the date's own day)
        #[arg(short, long)]
        day: Option<String>,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop tracking a habit this week
    Remove {
        /// Habit name
        name: String,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a habit, keeping its completion flags
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reorder a habit (0-based positions)
    Move {
        /// Current position
        from: usize,
        /// Target position
        to: usize,
        /// Any date inside the week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum EventCommands {
    /// Add an event to the week containing its date
    Add {
        /// Event date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: String,
        /// What happened
        text: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an event by id
    Remove {
        /// Event id (shown by `show` --json and `event add`)
        id: String,
        /// Any date inside the event's week (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn open_backend(config: &Config) -> Result<Box<dyn WeekBackend>> {
    match &config.remote_url {
        Some(url) => Ok(Box::new(RemoteClient::new(url, config.remote_key.clone())?)),
        None => Ok(Box::new(LocalBackend::open(&config.db_path)?)),
    }
}

/// Preferences are display-side and always stored locally, even when a
/// remote backend holds the journal rows. Falls back to process-lifetime
/// memory when the data directory is unusable.
fn open_prefs(config: &Config) -> Box<dyn PreferenceStore> {
    match LocalBackend::open(&config.db_path) {
        Ok(store) => Box::new(store),
        Err(err) => {
            eprintln!("Warning: preferences unavailable ({err:#}); using defaults for this run");
            Box::new(MemoryPrefs::new())
        }
    }
}

fn session(config: &Config) -> Result<JournalService> {
    let prefs_store = open_prefs(config);
    let start_day = prefs::load_week_start(prefs_store.as_ref(), &config.user_id);
    Ok(JournalService::new(
        open_backend(config)?,
        &config.user_id,
        start_day,
    ))
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Show { date, json } => {
            let mut svc = session(&config)?;
            cmd_show(&mut svc, parse_date(date)?, json)
        }
        Commands::Habit { command } => {
            let mut svc = session(&config)?;
            match command {
                HabitCommands::Add { name, date, json } => {
                    cmd_habit_add(&mut svc, parse_date(date)?, &name, json)
                }
                HabitCommands::Done {
                    name,
                    day,
                    date,
                    json,
                } => cmd_habit_done(&mut svc, parse_date(date)?, &name, day, json),
                HabitCommands::Remove { name, date, json } => {
                    cmd_habit_remove(&mut svc, parse_date(date)?, &name, json)
                }
                HabitCommands::Rename {
                    old,
                    new,
                    date,
                    json,
                } => cmd_habit_rename(&mut svc, parse_date(date)?, &old, &new, json),
                HabitCommands::Move {
                    from,
                    to,
                    date,
                    json,
                } => cmd_habit_move(&mut svc, parse_date(date)?, from, to, json),
            }
        }
        Commands::Mood { score, date, json } => {
            let mut svc = session(&config)?;
            cmd_mood(&mut svc, parse_date(date)?, score, json)
        }
        Commands::Meal {
            field,
            text,
            date,
            json,
        } => {
            let mut svc = session(&config)?;
            cmd_meal(&mut svc, parse_date(date)?, &field, &text, json)
        }
        Commands::Event { command } => {
            let mut svc = session(&config)?;
            match command {
                EventCommands::Add { date, text, json } => {
                    cmd_event_add(&mut svc, parse_date(Some(date))?, &text, json)
                }
                EventCommands::Remove { id, date, json } => {
                    cmd_event_remove(&mut svc, parse_date(date)?, &id, json)
                }
            }
        }
        Commands::Grateful { text, date, json } => {
            let mut svc = session(&config)?;
            cmd_grateful(&mut svc, parse_date(date)?, &text, json)
        }
        Commands::Comment { text, date, json } => {
            let mut svc = session(&config)?;
            cmd_comment(&mut svc, parse_date(date)?, &text, json)
        }
        Commands::Weeks { json } => {
            let backend = open_backend(&config)?;
            cmd_weeks(backend.as_ref(), &config.user_id, json)
        }
        Commands::Stats { weeks, json } => {
            let backend = open_backend(&config)?;
            cmd_stats(backend.as_ref(), &config.user_id, weeks, json)
        }
        Commands::Export { format, output } => {
            let backend = open_backend(&config)?;
            cmd_export(backend.as_ref(), &config.user_id, &format, output)
        }
        Commands::Review { date } => {
            let mut svc = session(&config)?;
            cmd_review(&mut svc, parse_date(date)?)
        }
        Commands::WeekStart { value } => {
            let prefs_store = open_prefs(&config);
            cmd_week_start(prefs_store.as_ref(), &config.user_id, value)
        }
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            let store = LocalBackend::open(&config.db_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(server::start_server(store, port, &bind, api_key))
        }
    }
}
