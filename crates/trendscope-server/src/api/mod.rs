mod cycle;
mod market;
mod trends;
mod usage;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, CycleGate, RateLimitState,
    RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<trendscope_core::AppConfig>,
    pub markets: Arc<trendscope_core::MarketsFile>,
    pub cycle_gate: CycleGate,
    /// Held for the duration of one cycle run; a second trigger while a run
    /// is in flight gets a conflict instead of a concurrent cycle.
    pub cycle_lock: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" | "cycle_running" | "quota_exceeded" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "disabled" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &trendscope_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-cycle-secret"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/trends", get(trends::list_trends))
        .route("/api/v1/market/window", get(market::get_market_window))
        .route(
            "/api/v1/usage/{user_id}/{feature_key}",
            get(usage::get_feature_usage),
        )
        .route("/api/v1/usage", post(usage::record_usage))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    // The cycle trigger is outside bearer auth: it has its own shared-secret
    // gate, checked before any work is planned.
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/cycle/run", post(cycle::run_cycle));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match trendscope_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::trends::TrendItem;
    use super::usage::UsageData;
    use super::*;
    use crate::test_support::{lazy_pool, test_config, test_markets};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// App wired to a lazy pool that never connects; only auth-rejection
    /// paths (which run before any query) are exercised.
    fn test_app(cycle_secret: Option<&str>) -> Router {
        let config = Arc::new(test_config());
        let pool = lazy_pool(&config);

        std::env::remove_var("TRENDSCOPE_API_KEYS");
        let auth = AuthState::from_env(true).expect("auth");
        let state = AppState {
            pool,
            cycle_gate: CycleGate::new(cycle_secret),
            config,
            markets: Arc::new(test_markets()),
            cycle_lock: Arc::new(tokio::sync::Mutex::new(())),
        };
        build_app(state, auth, default_rate_limit_state())
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_quota_exceeded_maps_to_conflict() {
        let response = ApiError::new("req-1", "quota_exceeded", "monthly limit").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn trend_item_is_serializable() {
        // Proves the type compiles and serde works — no DB needed.
        let item = TrendItem {
            id: Uuid::new_v4(),
            name: "Veste workwear".to_string(),
            brand: "Maison Rive".to_string(),
            category: "outerwear".to_string(),
            style_tag: "workwear".to_string(),
            segment: "homme".to_string(),
            market_zone: "EU".to_string(),
            score: 72.5,
            score_delta: 12.0,
            phase: "growing".to_string(),
            advisory_text: None,
            advisory_rationale: None,
            image_ref: None,
            first_observed_at: Utc::now(),
            last_scored_at: None,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"phase\":\"growing\""));
        assert!(json.contains("\"advisory_text\":null"));
    }

    #[test]
    fn usage_data_is_serializable() {
        let data = UsageData {
            user_id: Uuid::new_v4(),
            feature_key: "advisory".to_string(),
            month_start: Utc::now(),
            used: 3,
        };
        let json = serde_json::to_value(&data).expect("serialize");
        assert_eq!(json["used"], 3);
        assert_eq!(json["feature_key"], "advisory");
    }

    #[tokio::test]
    async fn cycle_run_without_secret_is_unauthorized() {
        let app = test_app(Some("cycle-secret"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/cycle/run")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cycle_run_with_wrong_secret_is_unauthorized() {
        let app = test_app(Some("cycle-secret"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/cycle/run")
                    .header("x-cycle-secret", "not-the-secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn cycle_run_without_configured_secret_is_disabled() {
        let app = test_app(None);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/cycle/run")
                    .header("x-cycle-secret", "anything")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn usage_post_rejects_malformed_user_id() {
        let app = test_app(Some("cycle-secret"));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/usage")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"user_id":"not-a-uuid","feature_key":"advisory"}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        // Axum's Json extractor rejects before the handler runs.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
