//! Database operations for persisted `market_windows` snapshots.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `market_windows` table.
///
/// `payload` holds the serialized window (top movers, winners, losers) as
/// produced by the aggregation stage.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MarketWindowRow {
    pub id: i64,
    pub segment: String,
    pub market_zone: String,
    pub week_start: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub computed_at: DateTime<Utc>,
}

/// Upserts the window snapshot for one `(segment, market zone, week start)`
/// key. Recomputation replaces the previous payload in place.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_market_window(
    pool: &PgPool,
    segment: &str,
    market_zone: &str,
    week_start: DateTime<Utc>,
    payload: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO market_windows (segment, market_zone, week_start, payload, computed_at) \
         VALUES ($1, $2, $3, $4::jsonb, NOW()) \
         ON CONFLICT (segment, market_zone, week_start) DO UPDATE SET \
             payload     = EXCLUDED.payload, \
             computed_at = NOW()",
    )
    .bind(segment)
    .bind(market_zone)
    .bind(week_start)
    .bind(payload)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches the stored snapshot for one window key, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_market_window(
    pool: &PgPool,
    segment: &str,
    market_zone: &str,
    week_start: DateTime<Utc>,
) -> Result<Option<MarketWindowRow>, DbError> {
    let row = sqlx::query_as::<_, MarketWindowRow>(
        "SELECT id, segment, market_zone, week_start, payload, computed_at \
         FROM market_windows \
         WHERE segment = $1 AND market_zone = $2 AND week_start = $3",
    )
    .bind(segment)
    .bind(market_zone)
    .bind(week_start)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
