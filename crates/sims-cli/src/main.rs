mod scrape;
mod submission;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::submission::SubmissionCommands;

#[derive(Debug, Parser)]
#[command(name = "sims-cli")]
#[command(about = "SIMS occurrence submission command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Register and inspect occurrence submissions
    Submission {
        #[command(subcommand)]
        command: SubmissionCommands,
    },
    /// Resolve a Darwin Core archive and store its occurrences
    Scrape {
        /// Submission the occurrences belong to
        #[arg(long)]
        submission: i64,
        /// Directory or zip file holding event, occurrence, and taxon sheets
        #[arg(long)]
        archive: PathBuf,
        /// Resolve and print records without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored occurrences for a submission
    Occurrences {
        #[arg(long)]
        submission: i64,
        /// Maximum number of occurrences to show
        #[arg(long, default_value = "50")]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("sims-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let config = sims_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Commands::Scrape {
        submission,
        archive,
        dry_run: true,
    } = &command
    {
        return scrape::run_scrape_dry_run(&config, *submission, archive).await;
    }

    let pool_config = sims_db::PoolConfig::from_app_config(&config);
    let pool = sims_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            sims_db::ping(&pool).await?;
            println!("database: ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = sims_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Submission { command } => submission::run(&pool, command).await?,
        Commands::Scrape {
            submission,
            archive,
            ..
        } => scrape::run_scrape(&pool, &config, submission, &archive).await?,
        Commands::Occurrences { submission, limit } => {
            submission::run_list_occurrences(&pool, submission, limit).await?;
        }
    }

    Ok(())
}
