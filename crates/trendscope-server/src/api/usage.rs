use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct UsageData {
    pub user_id: Uuid,
    pub feature_key: String,
    pub month_start: DateTime<Utc>,
    pub used: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecordUsageBody {
    pub user_id: Uuid,
    pub feature_key: String,
    /// When present, the event is only recorded while `used < monthly_limit`.
    pub monthly_limit: Option<i64>,
}

/// Current-month consumption for one `(user, feature)` pair.
///
/// Derived by counting ledger events inside the UTC calendar month; never
/// read from a stored counter.
pub(super) async fn get_feature_usage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((user_id, feature_key)): Path<(Uuid, String)>,
) -> Result<Json<ApiResponse<UsageData>>, ApiError> {
    let (month_start, month_end) = trendscope_engine::month_bounds(Utc::now());
    let used = trendscope_db::feature_count_between(
        &state.pool,
        user_id,
        &feature_key,
        month_start,
        month_end,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: UsageData {
            user_id,
            feature_key,
            month_start,
            used,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Append one usage event, optionally enforcing a monthly cap.
///
/// With `monthly_limit` set, a user already at the cap gets `quota_exceeded`
/// and nothing is written. The returned `used` includes the new event.
pub(super) async fn record_usage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RecordUsageBody>,
) -> Result<Json<ApiResponse<UsageData>>, ApiError> {
    let feature_key = body.feature_key.trim();
    if feature_key.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "feature_key must not be empty",
        ));
    }

    let now = Utc::now();
    let (month_start, month_end) = trendscope_engine::month_bounds(now);
    let used = trendscope_db::feature_count_between(
        &state.pool,
        body.user_id,
        feature_key,
        month_start,
        month_end,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if let Some(limit) = body.monthly_limit {
        if used >= limit {
            return Err(ApiError::new(
                req_id.0,
                "quota_exceeded",
                format!("monthly limit of {limit} reached for '{feature_key}'"),
            ));
        }
    }

    trendscope_db::record_usage(&state.pool, body.user_id, feature_key, now)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: UsageData {
            user_id: body.user_id,
            feature_key: feature_key.to_string(),
            month_start,
            used: used + 1,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
