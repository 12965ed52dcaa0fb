use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;

use bounty_core::NewAssignment;
use bounty_settings::{BountySettings, LogFormat};
use bounty_store::{
    Database, LeaderboardMode, LeaderboardRepo, LedgerRepo, MaintainerRepo, RecordRepo,
};
use bounty_telemetry::{OutputFormat, TelemetryConfig};

/// Bounty point ledger and leaderboard.
#[derive(Debug, Parser)]
#[command(name = "bounty", version)]
struct Cli {
    /// Settings file (defaults to ~/.bounty/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Database file, overriding settings and BOUNTY_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the tables if they do not exist.
    Migrate,
    /// Credit points to a contributor for a pull request.
    Assign {
        #[arg(long)]
        maintainer: String,
        #[arg(long)]
        contributor: String,
        #[arg(long = "pr")]
        pull_request_url: String,
        #[arg(long, allow_hyphen_values = true)]
        points: i64,
    },
    /// List ledger records.
    Records {
        /// Records currently crediting contributors matching this LIKE pattern.
        #[arg(long, conflicts_with = "pr")]
        contributor: Option<String>,
        /// Include superseded records in the contributor listing.
        #[arg(long, requires = "contributor")]
        history: bool,
        /// Full history of one pull request.
        #[arg(long)]
        pr: Option<String>,
    },
    /// Show contributor totals.
    Leaderboard {
        /// `materialized` reads the stored table, `live` aggregates the ledger now.
        #[arg(long, default_value_t = LeaderboardMode::Materialized)]
        mode: LeaderboardMode,
        /// Shorthand for `--mode live`.
        #[arg(long, conflicts_with = "mode")]
        live: bool,
    },
    /// Manage the maintainer allow-list.
    Maintainer {
        #[command(subcommand)]
        action: MaintainerAction,
    },
}

#[derive(Debug, Subcommand)]
enum MaintainerAction {
    Check { username: String },
    Add { username: String },
    Remove { username: String },
    List,
}

#[derive(Serialize)]
struct Flag<'a> {
    username: &'a str,
    value: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => bounty_settings::load_settings_from_path(path),
        None => bounty_settings::load_settings(),
    }
    .context("loading settings")?;
    if let Some(db) = &cli.db {
        settings.database.path = db.clone();
    }

    bounty_telemetry::init_telemetry(&telemetry_config(&settings)?);

    let db = Database::open(&settings.database.path)
        .with_context(|| format!("opening {}", settings.database.path.display()))?;
    db.set_busy_timeout(Duration::from_millis(settings.database.busy_timeout_ms))?;

    run(cli.command, &settings, db)
}

fn run(command: Command, settings: &BountySettings, db: Database) -> anyhow::Result<()> {
    match command {
        Command::Migrate => {
            db.ensure_schema().context("ensuring schema")?;
            tracing::info!(path = %db.path().display(), "schema ready");
        }
        Command::Assign {
            maintainer,
            contributor,
            pull_request_url,
            points,
        } => {
            if settings.ledger.require_maintainer
                && !MaintainerRepo::new(db.clone()).is_maintainer(&maintainer)?
            {
                bail!("{maintainer} is not a maintainer");
            }
            let assignment = NewAssignment::new(maintainer, contributor, pull_request_url, points);
            let record = LedgerRepo::new(db)
                .append(&assignment)
                .context("assigning bounty")?;
            print_json(&record)?;
        }
        Command::Records {
            contributor,
            history,
            pr,
        } => {
            let repo = RecordRepo::new(db);
            let records = match (contributor, pr) {
                (Some(name), _) if history => repo.history_for_contributor(&name)?,
                (Some(name), _) => repo.for_contributor(&name)?,
                (None, Some(url)) => repo.for_pull_request(&url)?,
                (None, None) => repo.all()?,
            };
            print_json(&records)?;
        }
        Command::Leaderboard { mode, live } => {
            let mode = if live { LeaderboardMode::Live } else { mode };
            print_json(&LeaderboardRepo::new(db).fetch(mode)?)?;
        }
        Command::Maintainer { action } => {
            let repo = MaintainerRepo::new(db);
            match action {
                MaintainerAction::Check { username } => {
                    let value = repo.is_maintainer(&username)?;
                    print_json(&Flag { username: &username, value })?;
                }
                MaintainerAction::Add { username } => {
                    let value = repo.add(&username)?;
                    print_json(&Flag { username: &username, value })?;
                }
                MaintainerAction::Remove { username } => {
                    let value = repo.remove(&username)?;
                    print_json(&Flag { username: &username, value })?;
                }
                MaintainerAction::List => print_json(&repo.list()?)?,
            }
        }
    }
    Ok(())
}

fn telemetry_config(settings: &BountySettings) -> anyhow::Result<TelemetryConfig> {
    let log_level = LevelFilter::from_str(&settings.logging.level)
        .with_context(|| format!("log level {:?}", settings.logging.level))?;
    Ok(TelemetryConfig {
        log_level,
        module_levels: Vec::new(),
        format: match settings.logging.format {
            LogFormat::Json => OutputFormat::Json,
            LogFormat::Compact => OutputFormat::Compact,
        },
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
