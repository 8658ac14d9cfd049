//! Database operations for the append-only `usage_events` ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Appends one usage event. Events are never updated or deleted; consumption
/// is always derived by counting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_usage(
    pool: &PgPool,
    user_id: Uuid,
    feature_key: &str,
    used_at: DateTime<Utc>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO usage_events (user_id, feature_key, used_at) \
         VALUES ($1, $2, $3) \
         RETURNING id",
    )
    .bind(user_id)
    .bind(feature_key)
    .bind(used_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Counts a user's events for one feature in the half-open interval
/// `[from, to)`. Callers pass calendar-month bounds to get the monthly
/// consumption.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn feature_count_between(
    pool: &PgPool,
    user_id: Uuid,
    feature_key: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM usage_events \
         WHERE user_id = $1 \
           AND feature_key = $2 \
           AND used_at >= $3 \
           AND used_at < $4",
    )
    .bind(user_id)
    .bind(feature_key)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
