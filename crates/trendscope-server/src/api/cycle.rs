use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;
use trendscope_engine::{CycleMode, CycleReport};

use crate::middleware::{CycleAccess, RequestId};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CycleQuery {
    #[serde(default)]
    pub turbo: bool,
}

/// Secret-gated trigger for one full brain cycle.
///
/// The `x-cycle-secret` header is verified before any stage work is planned
/// or started; only one cycle runs at a time.
pub(super) async fn run_cycle(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(query): Query<CycleQuery>,
) -> Result<Json<ApiResponse<CycleReport>>, ApiError> {
    let provided = headers
        .get("x-cycle-secret")
        .and_then(|v| v.to_str().ok());

    match state.cycle_gate.verify(provided) {
        CycleAccess::Granted => {}
        CycleAccess::Disabled => {
            return Err(ApiError::new(
                req_id.0,
                "disabled",
                "cycle trigger is not configured on this server",
            ));
        }
        CycleAccess::Denied => {
            tracing::warn!("cycle trigger rejected: bad or missing secret");
            return Err(ApiError::new(
                req_id.0,
                "unauthorized",
                "missing or invalid cycle secret",
            ));
        }
    }

    let Ok(_guard) = state.cycle_lock.try_lock() else {
        return Err(ApiError::new(
            req_id.0,
            "cycle_running",
            "a cycle is already in progress",
        ));
    };

    let mode = CycleMode::from_turbo_flag(query.turbo);
    let report = crate::cycle::run_cycle(&state.pool, &state.config, &state.markets, mode).await;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}
