use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use levelup::{Category, Config};

mod cli;

#[derive(Parser)]
#[command(name = "levelup")]
#[command(about = "Per-category XP, levels and prestige")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.levelup/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the ledger database (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a user's levels, prestige and routine streaks
    Show {
        user: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Award XP, e.g. `levelup award alice physical=50 mental=20`
    Award {
        user: String,

        /// Gains as CATEGORY=XP
        #[arg(required = true, value_parser = cli::award::parse_gain)]
        gains: Vec<(Category, i64)>,

        /// Apply the routine streak bonus
        #[arg(long)]
        streak: bool,
    },

    /// Prestige a category that reached the max level
    Prestige { user: String, category: Category },

    /// Record a routine completion (routines are defined in the config)
    Complete {
        user: String,
        routine: String,

        /// Completion day as YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a user's progression and routine log
    Reset {
        user: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Write a default config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config, force).await;
    }

    let config = Config::load(cli.config.as_deref())?;
    let engine = cli::Engine::open(&config, cli.db.as_deref())?;

    match cli.command {
        Commands::Show { user, json } => {
            cli::show::show_command(&engine, &user, json).await?;
        }
        Commands::Award {
            user,
            gains,
            streak,
        } => {
            cli::award::award_command(&engine, &user, &gains, streak).await?;
        }
        Commands::Prestige { user, category } => {
            cli::award::prestige_command(&engine, &user, category).await?;
        }
        Commands::Complete {
            user,
            routine,
            date,
        } => {
            cli::routine::complete_command(&engine, &user, &routine, date).await?;
        }
        Commands::Reset { user, yes } => {
            cli::reset::reset_command(&engine, &user, yes).await?;
        }
        Commands::Init { .. } => unreachable!("handled above"),
    }

    Ok(())
}
