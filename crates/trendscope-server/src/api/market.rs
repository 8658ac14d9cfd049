use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct MarketWindowData {
    pub segment: String,
    pub market_zone: String,
    pub week_start: DateTime<Utc>,
    pub window: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct MarketWindowQuery {
    pub segment: String,
    pub zone: String,
    /// Any date inside the wanted ISO week; defaults to today.
    pub week_of: Option<NaiveDate>,
}

/// Serve the ranked movers/winners/losers for one `(segment, zone, week)`.
///
/// The current week is always recomputed live from the scored records; past
/// weeks are served from the snapshot persisted by the aggregation stage.
pub(super) async fn get_market_window(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<MarketWindowQuery>,
) -> Result<Json<ApiResponse<MarketWindowData>>, ApiError> {
    if !state
        .markets
        .segments
        .iter()
        .any(|s| s.name == query.segment)
    {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("unknown segment '{}'", query.segment),
        ));
    }
    if !state.markets.zones.contains(&query.zone) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("unknown market zone '{}'", query.zone),
        ));
    }

    let now = Utc::now();
    let current_week = trendscope_engine::iso_week_start(now);
    let week_start = match query.week_of {
        Some(date) => trendscope_engine::iso_week_start(
            date.and_hms_opt(12, 0, 0)
                .unwrap_or_default()
                .and_utc(),
        ),
        None => current_week,
    };

    let window = if week_start == current_week {
        let rows =
            trendscope_db::list_window_entries(&state.pool, &query.segment, &query.zone, week_start)
                .await
                .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

        let entries: Vec<trendscope_engine::WindowEntry> = rows
            .into_iter()
            .map(|row| trendscope_engine::WindowEntry {
                record_id: row.id,
                name: row.name,
                brand: row.brand,
                score: row.score,
                delta: row.score_delta,
                first_observed_at: row.first_observed_at,
            })
            .collect();

        let significance = trendscope_engine::ScoringPolicy::default().significance;
        let computed = trendscope_engine::compute_window(&entries, significance);
        serde_json::to_value(&computed).map_err(|e| {
            tracing::error!(error = %e, "market window serialization failed");
            ApiError::new(req_id.0.clone(), "internal_error", "serialization failed")
        })?
    } else {
        let snapshot = trendscope_db::get_market_window(
            &state.pool,
            &query.segment,
            &query.zone,
            week_start,
        )
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

        match snapshot {
            Some(row) => row.payload,
            None => {
                return Err(ApiError::new(
                    req_id.0,
                    "not_found",
                    "no snapshot stored for that week",
                ))
            }
        }
    };

    Ok(Json(ApiResponse {
        data: MarketWindowData {
            segment: query.segment,
            market_zone: query.zone,
            week_start,
            window,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
