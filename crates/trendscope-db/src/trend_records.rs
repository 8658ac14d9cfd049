//! Database operations for `trend_records`, `signal_samples`, and
//! `score_observations`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Input for the trend-record upsert, produced by catalog normalization.
#[derive(Debug, Clone)]
pub struct NewTrendRecord {
    pub source_ref: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub style_tag: String,
    pub segment: String,
    pub market_zone: String,
}

/// A full row from the `trend_records` table, as served by the trends API.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendRecordRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub style_tag: String,
    pub segment: String,
    pub market_zone: String,
    pub score: f64,
    pub score_delta: f64,
    pub phase: String,
    pub advisory_text: Option<String>,
    pub advisory_rationale: Option<String>,
    pub image_ref: Option<String>,
    pub first_observed_at: DateTime<Utc>,
    pub last_scored_at: Option<DateTime<Utc>>,
}

/// Filters for the trends listing.
#[derive(Debug, Default)]
pub struct TrendListFilters<'a> {
    pub segment: Option<&'a str>,
    pub market_zone: Option<&'a str>,
    pub phase: Option<&'a str>,
    pub limit: Option<i64>,
}

/// Minimal projection used by the scoring stage.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoringRow {
    pub id: i64,
    pub segment: String,
    pub market_zone: String,
    pub score: f64,
}

/// One raw signal sample, as stored at ingestion time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SignalSampleRow {
    pub popularity: f64,
    pub velocity: f64,
    pub observed_at: DateTime<Utc>,
}

/// Projection used when recomputing a market window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WindowEntryRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub brand: String,
    pub score: f64,
    pub score_delta: f64,
    pub first_observed_at: DateTime<Utc>,
}

/// A record still awaiting enrichment (no advisory and no image yet).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrichCandidateRow {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub style_tag: String,
    pub segment: String,
    pub score: f64,
    pub phase: String,
}

// ---------------------------------------------------------------------------
// trend_records operations
// ---------------------------------------------------------------------------

/// Upserts a trend record from one normalized observation.
///
/// Conflicts on `(source_ref, segment, market_zone)` update the descriptive
/// fields in place; score, phase, and enrichment columns are never touched by
/// the upsert. Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_trend_record(pool: &PgPool, record: &NewTrendRecord) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO trend_records \
             (source_ref, name, brand, category, style_tag, segment, market_zone) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (source_ref, segment, market_zone) DO UPDATE SET \
             name       = EXCLUDED.name, \
             brand      = EXCLUDED.brand, \
             category   = EXCLUDED.category, \
             style_tag  = EXCLUDED.style_tag, \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(&record.source_ref)
    .bind(&record.name)
    .bind(&record.brand)
    .bind(&record.category)
    .bind(&record.style_tag)
    .bind(&record.segment)
    .bind(&record.market_zone)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Appends one raw signal sample for a record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_signal_sample(
    pool: &PgPool,
    record_id: i64,
    popularity: f64,
    velocity: f64,
    observed_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO signal_samples (record_id, popularity, velocity, observed_at) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(record_id)
    .bind(popularity)
    .bind(velocity)
    .bind(observed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Lists trend records for the dashboard, highest score first.
///
/// All filters are optional and combine with AND. `NULLIF`-style coalescing
/// keeps this a single statement whatever the filter combination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_trend_records(
    pool: &PgPool,
    filters: TrendListFilters<'_>,
) -> Result<Vec<TrendRecordRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendRecordRow>(
        "SELECT id, public_id, name, brand, category, style_tag, segment, market_zone, \
                score, score_delta, phase, advisory_text, advisory_rationale, image_ref, \
                first_observed_at, last_scored_at \
         FROM trend_records \
         WHERE ($1::text IS NULL OR segment = $1) \
           AND ($2::text IS NULL OR market_zone = $2) \
           AND ($3::text IS NULL OR phase = $3) \
         ORDER BY score DESC, id \
         LIMIT $4",
    )
    .bind(filters.segment)
    .bind(filters.market_zone)
    .bind(filters.phase)
    .bind(filters.limit.unwrap_or(50))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lists all records in the given segments, with their current score.
///
/// The scoring stage iterates this set; percentile ranks are computed per
/// segment over the returned scores.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scoring_rows(
    pool: &PgPool,
    segments: &[String],
) -> Result<Vec<ScoringRow>, DbError> {
    let rows = sqlx::query_as::<_, ScoringRow>(
        "SELECT id, segment, market_zone, score \
         FROM trend_records \
         WHERE segment = ANY($1) \
         ORDER BY segment, market_zone, id",
    )
    .bind(segments)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches the signal samples for a record observed after `since`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_signal_samples_since(
    pool: &PgPool,
    record_id: i64,
    since: DateTime<Utc>,
) -> Result<Vec<SignalSampleRow>, DbError> {
    let rows = sqlx::query_as::<_, SignalSampleRow>(
        "SELECT popularity, velocity, observed_at \
         FROM signal_samples \
         WHERE record_id = $1 AND observed_at > $2 \
         ORDER BY observed_at",
    )
    .bind(record_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches the most recent `limit` scores for a record, ordered
/// oldest-to-newest.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_score_history(
    pool: &PgPool,
    record_id: i64,
    limit: i64,
) -> Result<Vec<f64>, DbError> {
    let scores: Vec<f64> = sqlx::query_scalar::<_, f64>(
        "SELECT score FROM ( \
             SELECT score, scored_at FROM score_observations \
             WHERE record_id = $1 \
             ORDER BY scored_at DESC \
             LIMIT $2 \
         ) recent \
         ORDER BY scored_at",
    )
    .bind(record_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(scores)
}

/// Persists one scoring pass for a record: updates the live score, delta, and
/// phase, and appends the score to the record's observation history. Both
/// writes happen in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either write fails.
pub async fn apply_scoring(
    pool: &PgPool,
    record_id: i64,
    score: f64,
    delta: f64,
    phase: &str,
    scored_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE trend_records SET \
             score          = $2, \
             score_delta    = $3, \
             phase          = $4, \
             last_scored_at = $5, \
             updated_at     = NOW() \
         WHERE id = $1",
    )
    .bind(record_id)
    .bind(score)
    .bind(delta)
    .bind(phase)
    .bind(scored_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO score_observations (record_id, score, score_delta, phase, scored_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record_id)
    .bind(score)
    .bind(delta)
    .bind(phase)
    .bind(scored_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Lists the window entries for one `(segment, market zone)` pair: every
/// record scored within the given ISO week.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_window_entries(
    pool: &PgPool,
    segment: &str,
    market_zone: &str,
    week_start: DateTime<Utc>,
) -> Result<Vec<WindowEntryRow>, DbError> {
    let week_end = week_start + chrono::Duration::days(7);

    let rows = sqlx::query_as::<_, WindowEntryRow>(
        "SELECT id, public_id, name, brand, score, score_delta, first_observed_at \
         FROM trend_records \
         WHERE segment = $1 \
           AND market_zone = $2 \
           AND last_scored_at >= $3 \
           AND last_scored_at < $4",
    )
    .bind(segment)
    .bind(market_zone)
    .bind(week_start)
    .bind(week_end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Enrichment operations
// ---------------------------------------------------------------------------

/// Selects up to `limit` records that still lack both advisory and image,
/// highest score first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn select_unenriched(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<EnrichCandidateRow>, DbError> {
    let rows = sqlx::query_as::<_, EnrichCandidateRow>(
        "SELECT id, name, brand, category, style_tag, segment, score, phase \
         FROM trend_records \
         WHERE advisory_text IS NULL AND image_ref IS NULL \
         ORDER BY score DESC, id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Atomically commits enrichment output for one record.
///
/// The `WHERE advisory_text IS NULL` precondition makes the commit
/// first-writer-wins: a second caller that raced on the same record sees
/// `rows_affected == 0` and gets `false` back, leaving the earlier output
/// untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_enrichment(
    pool: &PgPool,
    record_id: i64,
    advisory: &str,
    rationale: &str,
    image_ref: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE trend_records SET \
             advisory_text      = $2, \
             advisory_rationale = $3, \
             image_ref          = $4, \
             enriched_at        = NOW(), \
             updated_at         = NOW() \
         WHERE id = $1 AND advisory_text IS NULL",
    )
    .bind(record_id)
    .bind(advisory)
    .bind(rationale)
    .bind(image_ref)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
