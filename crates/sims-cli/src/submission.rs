//! Submission and occurrence read/write commands.

use std::path::PathBuf;

use clap::Subcommand;

/// Sub-commands available under `submission`.
#[derive(Debug, Subcommand)]
pub enum SubmissionCommands {
    /// Register a new submission in `submitted` status
    Create {
        /// Where the submission came from
        #[arg(long, default_value = "cli")]
        source: String,
        /// Original file name of the uploaded archive
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show a submission and its status
    Show {
        #[arg(long)]
        id: i64,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: SubmissionCommands) -> anyhow::Result<()> {
    match command {
        SubmissionCommands::Create { source, file } => {
            let file_name = file
                .as_deref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned());
            let row = sims_db::create_submission(pool, &source, file_name.as_deref()).await?;
            tracing::info!(submission_id = row.id, public_id = %row.public_id, "submission created");
            println!("submission {} ({})", row.id, row.public_id);
        }
        SubmissionCommands::Show { id } => {
            let row = sims_db::get_submission(pool, id).await?;
            println!("id:           {}", row.id);
            println!("public id:    {}", row.public_id);
            println!("source:       {}", row.source);
            println!(
                "file:         {}",
                row.input_file_name.as_deref().unwrap_or("\u{2014}")
            );
            println!("status:       {}", row.status);
            println!("occurrences:  {}", row.occurrence_count);
            println!("created:      {}", row.created_at.format("%Y-%m-%d %H:%M:%S"));
            if let Some(scraped_at) = row.scraped_at {
                println!("scraped:      {}", scraped_at.format("%Y-%m-%d %H:%M:%S"));
            }
            if let Some(message) = row.error_message {
                println!("error:        {message}");
            }
        }
    }
    Ok(())
}

pub(crate) async fn run_list_occurrences(
    pool: &sqlx::PgPool,
    submission_id: i64,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = sims_db::list_occurrences_for_submission(pool, submission_id, limit).await?;
    if rows.is_empty() {
        println!("no occurrences stored for submission {submission_id}");
        return Ok(());
    }

    for row in rows {
        let point = match (row.longitude, row.latitude) {
            (Some(lon), Some(lat)) => format!("{lon:.6}, {lat:.6}"),
            _ => "\u{2014}".to_string(),
        };
        let date = row
            .eventdate
            .map_or_else(|| "\u{2014}".to_string(), |d| d.format("%Y-%m-%d").to_string());
        println!(
            "{:>8}  {:<10}  {:<28}  {:<20}  {}",
            row.id,
            date,
            row.associatedtaxa.as_deref().unwrap_or("\u{2014}"),
            row.vernacularname.as_deref().unwrap_or("\u{2014}"),
            point
        );
    }
    Ok(())
}
