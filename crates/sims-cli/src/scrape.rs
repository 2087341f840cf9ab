//! Scrape command: load a Darwin Core archive, resolve its occurrences, and
//! persist them for a submission.
//!
//! Loading and resolution run on the blocking pool; the whole pass, inserts
//! included, is bounded by `SIMS_SCRAPE_TIMEOUT_SECS`. On timeout the
//! uncommitted transaction is dropped, which rolls it back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use sims_core::{AppConfig, OccurrenceRecord};
use sims_occurrence::OccurrenceResolver;

/// Scrape `archive` into `submission_id` and mark the submission `scraped`.
///
/// Any failure after the submission is validated marks it `failed` on a
/// best-effort basis before the error is returned. If the batch turns out to
/// have committed anyway, the stored count is reported and the call succeeds.
///
/// # Errors
///
/// Returns an error if the submission does not exist or was already
/// processed, the archive cannot be loaded, any insert fails, or the pass
/// exceeds the configured timeout.
pub(crate) async fn run_scrape(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    submission_id: i64,
    archive: &Path,
) -> anyhow::Result<()> {
    let submission = sims_db::get_submission(pool, submission_id)
        .await
        .with_context(|| format!("failed to load submission {submission_id}"))?;
    if submission.status != sims_db::SUBMISSION_SUBMITTED {
        anyhow::bail!(
            "submission {submission_id} is already {}; corrections require a new submission",
            submission.status
        );
    }

    let span = tracing::info_span!("scrape", submission_id);
    let timeout = Duration::from_secs(config.scrape_timeout_secs);
    let pass = scrape_and_persist(pool, config, submission_id, archive.to_path_buf(), span);

    let failure = match tokio::time::timeout(timeout, pass).await {
        Ok(Ok(inserted)) => {
            tracing::info!(submission_id, inserted, "scrape complete");
            println!("submission {submission_id}: stored {inserted} occurrence(s)");
            return Ok(());
        }
        Ok(Err(e)) => e,
        Err(_) => anyhow::anyhow!(
            "scrape timed out after {}s; no occurrences were stored",
            config.scrape_timeout_secs
        ),
    };

    // A pass abandoned while COMMIT was in flight may still have stored the
    // batch; the submission row is the source of truth.
    if let Some(stored) = settle_failed_pass(pool, submission_id, &format!("{failure:#}")).await {
        tracing::warn!(
            submission_id,
            stored,
            error = %failure,
            "pass reported an error after its transaction committed"
        );
        println!("submission {submission_id}: stored {stored} occurrence(s)");
        return Ok(());
    }
    Err(failure)
}

/// Resolve `archive` and print the records that would be stored.
///
/// # Errors
///
/// Returns an error if the archive cannot be loaded.
pub(crate) async fn run_scrape_dry_run(
    config: &AppConfig,
    submission_id: i64,
    archive: &Path,
) -> anyhow::Result<()> {
    let span = tracing::info_span!("scrape", submission_id, dry_run = true);
    let records = resolve_on_blocking_pool(config, archive.to_path_buf(), span).await?;

    let summary = summarize(&records);
    println!(
        "dry-run: would store {} occurrence(s) for submission {submission_id} \
         ({} with event date, {} with a resolved point)",
        summary.total, summary.with_event_date, summary.with_point
    );
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn scrape_and_persist(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    submission_id: i64,
    archive: PathBuf,
    span: tracing::Span,
) -> anyhow::Result<u64> {
    let records = resolve_on_blocking_pool(config, archive, span).await?;
    let params: Vec<_> = records.iter().map(sims_occurrence::insert_params).collect();

    let inserted = sims_db::insert_occurrences(pool, submission_id, &params)
        .await
        .with_context(|| format!("failed to store occurrences for submission {submission_id}"))?;
    Ok(inserted)
}

async fn resolve_on_blocking_pool(
    config: &AppConfig,
    archive: PathBuf,
    span: tracing::Span,
) -> anyhow::Result<Vec<OccurrenceRecord>> {
    let delimiter = config.archive_delimiter.as_byte();
    tokio::task::spawn_blocking(move || load_and_resolve(&archive, delimiter, span))
        .await
        .context("archive resolution task failed")?
}

fn load_and_resolve(
    archive: &Path,
    delimiter: u8,
    span: tracing::Span,
) -> anyhow::Result<Vec<OccurrenceRecord>> {
    let sheets = sims_occurrence::load_archive(archive, delimiter)
        .with_context(|| format!("failed to load archive {}", archive.display()))?;
    Ok(OccurrenceResolver::new(span).resolve(&sheets))
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ScrapeSummary {
    pub total: usize,
    pub with_event_date: usize,
    pub with_point: usize,
}

pub(crate) fn summarize(records: &[OccurrenceRecord]) -> ScrapeSummary {
    ScrapeSummary {
        total: records.len(),
        with_event_date: records.iter().filter(|r| r.event_date.is_some()).count(),
        with_point: records
            .iter()
            .filter(|r| sims_occurrence::insert_params(r).coordinate.is_some())
            .count(),
    }
}

/// Marks the submission `failed` after an unsuccessful pass.
///
/// The mark only applies to a `submitted` row. When it is refused, the row is
/// re-read: a `scraped` submission means the transaction committed before the
/// pass was abandoned, and its stored count is returned.
async fn settle_failed_pass(pool: &sqlx::PgPool, submission_id: i64, message: &str) -> Option<i32> {
    match sims_db::fail_submission(pool, submission_id, message).await {
        Ok(()) => None,
        Err(sims_db::DbError::InvalidSubmissionTransition { .. }) => {
            match sims_db::get_submission(pool, submission_id).await {
                Ok(row) => committed_count(&row.status, row.occurrence_count),
                Err(e) => {
                    tracing::error!(submission_id, error = %e, "failed to re-read submission");
                    None
                }
            }
        }
        Err(e) => {
            tracing::error!(submission_id, error = %e, "failed to mark submission as failed");
            None
        }
    }
}

/// Occurrences stored by a submission whose pass ended in an error, or
/// `None` when nothing was committed.
pub(crate) fn committed_count(status: &str, occurrence_count: i32) -> Option<i32> {
    (status == sims_db::SUBMISSION_SCRAPED).then_some(occurrence_count)
}
