use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use crossterm::style::Stylize;
use job_tracker::commands::{ChartKind, Command};
use job_tracker::config::config::Config;
use job_tracker::data::data_store::{DataStore, Identifier};
use job_tracker::repl::{LinePrompter, Outcome, Session};
use job_tracker::table_display::DisplayOptions;
use job_tracker::utils::app_paths::AppPaths;
use job_tracker::utils::logging::init_logging;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "job-tracker",
    version,
    about = "Track job applications stored in a CSV file"
)]
struct Cli {
    /// Data file (defaults to store.default_file from the config)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Load settings from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a commented default config file and exit
    #[arg(long)]
    generate_config: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Refuse updates to columns missing from the file header
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Option<OneShot>,
}

/// Commands that print their result and exit without saving
#[derive(Subcommand)]
enum OneShot {
    /// Show every application
    List,
    /// Show applications by #position, company name or key:NAME
    View { id: String },
    /// Rows where COLUMN equals VALUE, or company + COLUMN for every row
    Filter { column: String, value: Option<String> },
    /// Aggregate view: status or sector
    Chart { kind: String },
}

impl OneShot {
    fn into_command(self) -> Result<Command> {
        Ok(match self {
            OneShot::List => Command::List,
            OneShot::View { id } => Command::View(id.parse::<Identifier>()?),
            OneShot::Filter { column, value } => Command::Filter { column, value },
            OneShot::Chart { kind } => Command::Chart(kind.parse::<ChartKind>()?),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => Config::get_config_path()?,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Config::create_default_with_comments())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Config written to {}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let log_dir = if config.logging.log_to_file {
        AppPaths::log_dir().ok()
    } else {
        None
    };
    if let Some(path) = init_logging(level, log_dir.as_deref()) {
        info!("Logging to {}", path.display());
    }

    let mut options = config.store.to_store_options()?;
    if cli.strict {
        options.strict_columns = true;
    }

    let file = cli
        .file
        .unwrap_or_else(|| config.store.default_file.clone());
    let store = DataStore::load(&file, options)
        .with_context(|| format!("opening {}", file.display()))?;

    let display = DisplayOptions {
        show_row_numbers: config.display.show_row_numbers,
        max_rows: config.display.max_display_rows,
        use_colors: config.display.use_colors,
    };
    let mut session = Session::new(store, display, config.display.confirm_remove);

    match cli.command {
        Some(one_shot) => {
            let command = one_shot.into_command()?;
            if let Outcome::Continue(output) = session.execute(command, &mut LinePrompter::new())? {
                println!("{}", output);
            }
            Ok(())
        }
        None => {
            let history = match AppPaths::history_file() {
                Ok(path) => Some(path),
                Err(e) => {
                    eprintln!("{}", format!("History disabled: {}", e).yellow());
                    None
                }
            };
            session.run(history)
        }
    }
}
