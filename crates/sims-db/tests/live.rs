//! Live integration tests for sims-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The database must have the PostGIS extension
//! available. The `migrations` path is relative to the crate root
//! (`crates/sims-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use sims_core::{OccurrenceInsertParams, ResolvedCoordinate};
use sims_db::{
    create_submission, fail_submission, get_submission, insert_occurrences,
    list_occurrences_for_submission, DbError, SUBMISSION_FAILED, SUBMISSION_SCRAPED,
    SUBMISSION_SUBMITTED,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_params(taxa: &str, coordinate: Option<ResolvedCoordinate>) -> OccurrenceInsertParams {
    OccurrenceInsertParams {
        associated_taxa: Some(taxa.to_string()),
        life_stage: Some("adult".to_string()),
        data: serde_json::json!({ "headers": ["eventid"], "rows": ["E1"] }),
        vernacular_name: None,
        event_date: Some("2020-06-18T00:00:00.000Z".to_string()),
        individual_count: Some(1),
        organism_quantity: None,
        organism_quantity_type: None,
        coordinate,
    }
}

/// A point on the zone's central meridian at the equator; it projects to
/// exactly `(central_meridian, 0)` in WGS 84.
fn equator_point(zone_srid: i32, northing: f64) -> ResolvedCoordinate {
    ResolvedCoordinate {
        easting: 500_000.0,
        northing,
        zone_srid,
    }
}

async fn count_occurrences(pool: &sqlx::PgPool, submission_id: i64) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM occurrence WHERE occurrence_submission_id = $1",
    )
    .bind(submission_id)
    .fetch_one(pool)
    .await
    .expect("count query failed")
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("expected a coordinate value");
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

// ---------------------------------------------------------------------------
// Section 1: Submission lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_submission_starts_in_submitted_status(pool: sqlx::PgPool) {
    let row = create_submission(&pool, "cli", Some("bears.zip"))
        .await
        .expect("create_submission failed");

    assert_eq!(row.status, SUBMISSION_SUBMITTED);
    assert_eq!(row.occurrence_count, 0);
    assert_eq!(row.input_file_name.as_deref(), Some("bears.zip"));
    assert!(row.scraped_at.is_none());

    let fetched = get_submission(&pool, row.id)
        .await
        .expect("get_submission failed");
    assert_eq!(fetched.public_id, row.public_id);
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_submission_unknown_id_is_not_found(pool: sqlx::PgPool) {
    let result = get_submission(&pool, 999_999).await;
    assert!(
        matches!(result, Err(DbError::NotFound)),
        "expected NotFound, got: {result:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn fail_submission_records_error_and_is_final(pool: sqlx::PgPool) {
    let row = create_submission(&pool, "cli", None).await.unwrap();

    fail_submission(&pool, row.id, "archive has no taxon sheet")
        .await
        .expect("fail_submission failed");

    let failed = get_submission(&pool, row.id).await.unwrap();
    assert_eq!(failed.status, SUBMISSION_FAILED);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("archive has no taxon sheet")
    );

    let again = fail_submission(&pool, row.id, "second failure").await;
    assert!(
        matches!(again, Err(DbError::InvalidSubmissionTransition { .. })),
        "expected InvalidSubmissionTransition, got: {again:?}"
    );

    let insert = insert_occurrences(&pool, row.id, &[make_params("Ursus arctos", None)]).await;
    assert!(
        matches!(insert, Err(DbError::InvalidSubmissionTransition { .. })),
        "expected InvalidSubmissionTransition, got: {insert:?}"
    );
    assert_eq!(count_occurrences(&pool, row.id).await, 0);
}

// ---------------------------------------------------------------------------
// Section 2: Occurrence persistence
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_occurrences_projects_points_and_nulls_missing_coordinates(pool: sqlx::PgPool) {
    let submission = create_submission(&pool, "cli", None).await.unwrap();
    let batch = [
        make_params("Ursus arctos", Some(equator_point(32_633, 0.0))),
        make_params("Alces alces", None),
        make_params("Rangifer tarandus", Some(equator_point(32_733, 10_000_000.0))),
    ];

    let inserted = insert_occurrences(&pool, submission.id, &batch)
        .await
        .expect("insert_occurrences failed");
    assert_eq!(inserted, 3);

    let null_points = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM occurrence \
         WHERE occurrence_submission_id = $1 AND geography IS NULL",
    )
    .bind(submission.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(null_points, 1);

    let rows = list_occurrences_for_submission(&pool, submission.id, 10)
        .await
        .expect("list_occurrences_for_submission failed");
    assert_eq!(rows.len(), 3);

    // Zone 33 north and south share the 15°E central meridian.
    assert_eq!(rows[0].associatedtaxa.as_deref(), Some("Ursus arctos"));
    assert_close(rows[0].longitude, 15.0);
    assert_close(rows[0].latitude, 0.0);

    assert_eq!(rows[1].associatedtaxa.as_deref(), Some("Alces alces"));
    assert!(rows[1].longitude.is_none());
    assert!(rows[1].latitude.is_none());

    assert_eq!(rows[2].associatedtaxa.as_deref(), Some("Rangifer tarandus"));
    assert_close(rows[2].longitude, 15.0);
    assert_close(rows[2].latitude, 0.0);

    assert!(rows[0].eventdate.is_some());
    assert_eq!(rows[0].individualcount, Some(1));
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_occurrences_marks_submission_scraped(pool: sqlx::PgPool) {
    let submission = create_submission(&pool, "cli", None).await.unwrap();
    let batch = [make_params("Ursus arctos", None), make_params("Alces alces", None)];

    insert_occurrences(&pool, submission.id, &batch)
        .await
        .expect("insert_occurrences failed");

    let scraped = get_submission(&pool, submission.id).await.unwrap();
    assert_eq!(scraped.status, SUBMISSION_SCRAPED);
    assert_eq!(scraped.occurrence_count, 2);
    assert!(scraped.scraped_at.is_some());
    assert!(scraped.error_message.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_occurrences_rolls_back_whole_batch_on_failure(pool: sqlx::PgPool) {
    let submission = create_submission(&pool, "cli", None).await.unwrap();
    let mut bad_date = make_params("Alces alces", None);
    bad_date.event_date = Some("not a timestamp".to_string());
    let batch = [
        make_params("Ursus arctos", Some(equator_point(32_633, 0.0))),
        bad_date,
        make_params("Rangifer tarandus", None),
    ];

    let result = insert_occurrences(&pool, submission.id, &batch).await;
    assert!(
        matches!(result, Err(DbError::Sqlx(_))),
        "expected Sqlx error, got: {result:?}"
    );

    assert_eq!(count_occurrences(&pool, submission.id).await, 0);
    let unchanged = get_submission(&pool, submission.id).await.unwrap();
    assert_eq!(unchanged.status, SUBMISSION_SUBMITTED);
    assert_eq!(unchanged.occurrence_count, 0);
    assert!(unchanged.scraped_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn second_insert_after_scrape_is_refused(pool: sqlx::PgPool) {
    let submission = create_submission(&pool, "cli", None).await.unwrap();
    insert_occurrences(&pool, submission.id, &[make_params("Ursus arctos", None)])
        .await
        .expect("first insert_occurrences failed");

    let second = insert_occurrences(&pool, submission.id, &[make_params("Alces alces", None)]).await;
    assert!(
        matches!(
            second,
            Err(DbError::InvalidSubmissionTransition { id, .. }) if id == submission.id
        ),
        "expected InvalidSubmissionTransition, got: {second:?}"
    );

    assert_eq!(count_occurrences(&pool, submission.id).await, 1);
    let row = get_submission(&pool, submission.id).await.unwrap();
    assert_eq!(row.occurrence_count, 1);

    // A late failure mark cannot overwrite a committed scrape.
    let late = fail_submission(&pool, submission.id, "timed out").await;
    assert!(matches!(
        late,
        Err(DbError::InvalidSubmissionTransition { .. })
    ));
    assert_eq!(
        get_submission(&pool, submission.id).await.unwrap().status,
        SUBMISSION_SCRAPED
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn insert_occurrences_unknown_submission_is_not_found(pool: sqlx::PgPool) {
    let result = insert_occurrences(&pool, 424_242, &[make_params("Ursus arctos", None)]).await;
    assert!(
        matches!(result, Err(DbError::NotFound)),
        "expected NotFound, got: {result:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_batch_still_marks_submission_scraped(pool: sqlx::PgPool) {
    let submission = create_submission(&pool, "cli", None).await.unwrap();

    let inserted = insert_occurrences(&pool, submission.id, &[])
        .await
        .expect("insert_occurrences failed");
    assert_eq!(inserted, 0);

    let row = get_submission(&pool, submission.id).await.unwrap();
    assert_eq!(row.status, SUBMISSION_SCRAPED);
    assert_eq!(row.occurrence_count, 0);
}
