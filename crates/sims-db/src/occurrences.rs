//! Database operations for the `occurrence` table.

use chrono::{DateTime, Utc};
use sims_core::OccurrenceInsertParams;
use sqlx::PgPool;

use crate::submissions::SUBMISSION_SUBMITTED;
use crate::DbError;

/// A row from the `occurrence` table with its point projected back to
/// WGS 84 longitude/latitude.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OccurrenceRow {
    pub id: i64,
    pub occurrence_submission_id: i64,
    pub associatedtaxa: Option<String>,
    pub lifestage: Option<String>,
    pub vernacularname: Option<String>,
    pub eventdate: Option<DateTime<Utc>>,
    pub individualcount: Option<i32>,
    pub organismquantity: Option<String>,
    pub organismquantitytype: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub data: serde_json::Value,
    pub create_date: DateTime<Utc>,
}

/// Inserts every occurrence for a submission and marks it `scraped`.
///
/// All inserts and the status change share one transaction: a single
/// failure rolls back the whole batch and leaves the submission in
/// `submitted` status. The submission row is locked for the duration so two
/// concurrent scrapes of the same submission cannot both commit.
///
/// The geography point is projected from the record's UTM zone to WGS 84;
/// records without a resolved coordinate store `NULL`.
///
/// Returns the number of occurrences inserted.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the submission does not exist,
/// [`DbError::InvalidSubmissionTransition`] if it is not in `submitted`
/// status, or [`DbError::Sqlx`] if any statement fails.
pub async fn insert_occurrences(
    pool: &PgPool,
    submission_id: i64,
    occurrences: &[OccurrenceInsertParams],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let status: String = sqlx::query_scalar(
        "SELECT status FROM occurrence_submission WHERE id = $1 FOR UPDATE",
    )
    .bind(submission_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    if status != SUBMISSION_SUBMITTED {
        return Err(DbError::InvalidSubmissionTransition {
            id: submission_id,
            expected_status: SUBMISSION_SUBMITTED,
        });
    }

    let mut inserted = 0u64;
    for occurrence in occurrences {
        let coordinate = occurrence.coordinate;
        let result = sqlx::query(
            "INSERT INTO occurrence \
                 (occurrence_submission_id, associatedtaxa, lifestage, data, vernacularname, \
                  eventdate, individualcount, organismquantity, organismquantitytype, geography) \
             VALUES ($1, $2, $3, $4, $5, $6::timestamptz, $7, $8, $9, \
                 public.ST_Transform( \
                     public.ST_SetSRID(public.ST_MakePoint($10::float8, $11::float8), $12::int4), \
                     4326 \
                 )::geography)",
        )
        .bind(submission_id)
        .bind(&occurrence.associated_taxa)
        .bind(&occurrence.life_stage)
        .bind(&occurrence.data)
        .bind(&occurrence.vernacular_name)
        .bind(&occurrence.event_date)
        .bind(occurrence.individual_count)
        .bind(&occurrence.organism_quantity)
        .bind(&occurrence.organism_quantity_type)
        .bind(coordinate.map(|c| c.easting))
        .bind(coordinate.map(|c| c.northing))
        .bind(coordinate.map(|c| c.zone_srid))
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    // Bounded by the number of rows in one submission file.
    let count = i32::try_from(inserted).unwrap_or(i32::MAX);
    sqlx::query(
        "UPDATE occurrence_submission \
         SET status = 'scraped', occurrence_count = $1, scraped_at = NOW(), error_message = NULL \
         WHERE id = $2",
    )
    .bind(count)
    .bind(submission_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(inserted)
}

/// Returns up to `limit` occurrences for a submission in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_occurrences_for_submission(
    pool: &PgPool,
    submission_id: i64,
    limit: i64,
) -> Result<Vec<OccurrenceRow>, DbError> {
    let rows = sqlx::query_as::<_, OccurrenceRow>(
        "SELECT id, occurrence_submission_id, associatedtaxa, lifestage, vernacularname, \
                eventdate, individualcount, organismquantity, organismquantitytype, \
                public.ST_X(geography::geometry) AS longitude, \
                public.ST_Y(geography::geometry) AS latitude, \
                data, create_date \
         FROM occurrence \
         WHERE occurrence_submission_id = $1 \
         ORDER BY id \
         LIMIT $2",
    )
    .bind(submission_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
