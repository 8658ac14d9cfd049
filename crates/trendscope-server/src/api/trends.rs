use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct TrendItem {
    pub id: Uuid,
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

#[derive(Debug, Deserialize)]
pub(super) struct TrendQuery {
    pub segment: Option<String>,
    pub zone: Option<String>,
    pub phase: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<ApiResponse<Vec<TrendItem>>>, ApiError> {
    if let Some(phase) = query.phase.as_deref() {
        if trendscope_core::TrendPhase::parse_or_emerging(phase).as_str() != phase {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                format!("unknown phase '{phase}'"),
            ));
        }
    }

    let rows = trendscope_db::list_trend_records(
        &state.pool,
        trendscope_db::TrendListFilters {
            segment: query.segment.as_deref(),
            market_zone: query.zone.as_deref(),
            phase: query.phase.as_deref(),
            limit: Some(normalize_limit(query.limit)),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TrendItem {
            id: row.public_id,
            name: row.name,
            brand: row.brand,
            category: row.category,
            style_tag: row.style_tag,
            segment: row.segment,
            market_zone: row.market_zone,
            score: row.score,
            score_delta: row.score_delta,
            phase: row.phase,
            advisory_text: row.advisory_text,
            advisory_rationale: row.advisory_rationale,
            image_ref: row.image_ref,
            first_observed_at: row.first_observed_at,
            last_scored_at: row.last_scored_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
