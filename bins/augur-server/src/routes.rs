use std::collections::HashMap;

use augur_core::constants::{DEFAULT_HISTORY_INTERVAL_SECS, MAX_BLOCK_TARGET};
use augur_core::types::{format_timestamp, FeeEstimate};
use augur_core::AugurError;
use augur_node::FeeQueries;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Serialize, Serializer};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

const NO_ESTIMATES: &str = "No fee estimates available yet";
const BAD_BLOCK_TARGET: &str = "Invalid or missing number of blocks";
const BAD_TIMESTAMP: &str = "Invalid or missing timestamp";
const BAD_RANGE: &str = "Invalid or missing start_timestamp or end_timestamp";
const BAD_INTERVAL: &str = "Interval must be a positive number of seconds";
const RANGE_TOO_LARGE: &str = "Requested range spans too many intervals";

#[derive(Clone)]
pub struct AppState {
    pub queries: FeeQueries,
}

impl AppState {
    pub fn new(queries: FeeQueries) -> Self {
        Self { queries }
    }
}

// ── Error helper ─────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ApiError {
    BadRequest(&'static str),
    NoData,
    Internal(AugurError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            ApiError::NoData => (StatusCode::SERVICE_UNAVAILABLE, NO_ESTIMATES).into_response(),
            ApiError::Internal(e) => {
                error!("request failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Internal error: {e}")).into_response()
            }
        }
    }
}

impl From<AugurError> for ApiError {
    fn from(e: AugurError) -> Self {
        ApiError::Internal(e)
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Response shaping ─────────────────────────────────────────────────────────

/// Map serialized in insertion order.
struct OrderedMap<V>(Vec<(String, V)>);

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[derive(Serialize)]
struct ProbabilityEntry {
    fee_rate: f64,
}

#[derive(Serialize)]
struct BlockTargetEntry {
    probabilities: OrderedMap<ProbabilityEntry>,
}

#[derive(Serialize)]
pub struct FeeEstimateResponse {
    mempool_update_time: String,
    estimates: OrderedMap<BlockTargetEntry>,
}

impl From<&FeeEstimate> for FeeEstimateResponse {
    fn from(estimate: &FeeEstimate) -> Self {
        let estimates = estimate
            .estimates
            .iter()
            .map(|(target, block_target)| {
                let probabilities = block_target
                    .probabilities
                    .iter()
                    .map(|(p, rate)| {
                        (format!("{:.2}", p.0), ProbabilityEntry { fee_rate: round4(*rate) })
                    })
                    .collect();
                (
                    target.0.to_string(),
                    BlockTargetEntry { probabilities: OrderedMap(probabilities) },
                )
            })
            .collect();

        Self {
            mempool_update_time: format_timestamp(&estimate.timestamp),
            estimates: OrderedMap(estimates),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Treat empty estimates as missing data.
fn present(estimate: &FeeEstimate) -> ApiResult<FeeEstimateResponse> {
    if estimate.is_empty() {
        return Err(ApiError::NoData);
    }
    Ok(Json(estimate.into()))
}

fn parse_param<T: std::str::FromStr>(
    params: &HashMap<String, String>,
    key: &str,
) -> Option<T> {
    params.get(key).and_then(|v| v.trim().parse().ok())
}

// ── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/fees", get(latest_fees))
        .route("/fees/target/:num_blocks", get(fees_for_target))
        .route("/historical_fee", get(historical_fee))
        .route("/historical_fees", get(historical_fees))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// ── /fees ────────────────────────────────────────────────────────────────────

async fn latest_fees(State(s): State<AppState>) -> ApiResult<FeeEstimateResponse> {
    match s.queries.latest_estimate() {
        Some(estimate) => present(&estimate),
        None => Err(ApiError::NoData),
    }
}

// ── /fees/target/:num_blocks ─────────────────────────────────────────────────

async fn fees_for_target(
    State(s): State<AppState>,
    Path(num_blocks): Path<String>,
) -> ApiResult<FeeEstimateResponse> {
    let target = num_blocks
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0 && *n <= MAX_BLOCK_TARGET)
        .ok_or(ApiError::BadRequest(BAD_BLOCK_TARGET))?;

    let estimate = s.queries.latest_estimate_for_target(target).await?;
    present(&estimate)
}

// ── /historical_fee?timestamp= ───────────────────────────────────────────────

async fn historical_fee(
    State(s): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<FeeEstimateResponse> {
    let timestamp: i64 =
        parse_param(&params, "timestamp").ok_or(ApiError::BadRequest(BAD_TIMESTAMP))?;
    let estimate = match s.queries.estimate_at_timestamp(timestamp).await {
        Ok(estimate) => estimate,
        Err(AugurError::InvalidTimestamp(_)) => return Err(ApiError::BadRequest(BAD_TIMESTAMP)),
        Err(e) => return Err(e.into()),
    };
    present(&estimate)
}

// ── /historical_fees?start_timestamp=&end_timestamp=&interval= ──────────────

async fn historical_fees(
    State(s): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<FeeEstimateResponse>> {
    let start: i64 =
        parse_param(&params, "start_timestamp").ok_or(ApiError::BadRequest(BAD_RANGE))?;
    let end: i64 =
        parse_param(&params, "end_timestamp").ok_or(ApiError::BadRequest(BAD_RANGE))?;
    let interval: i64 = match params.get("interval") {
        None => DEFAULT_HISTORY_INTERVAL_SECS,
        Some(_) => parse_param(&params, "interval").ok_or(ApiError::BadRequest(BAD_INTERVAL))?,
    };
    if interval <= 0 {
        return Err(ApiError::BadRequest(BAD_INTERVAL));
    }

    let estimates = match s.queries.estimates_over_range(start, end, interval).await {
        Ok(Some(estimates)) => estimates,
        Ok(None) => return Err(ApiError::NoData),
        Err(AugurError::InvalidTimestamp(_)) => return Err(ApiError::BadRequest(BAD_RANGE)),
        Err(AugurError::RangeTooLarge { .. }) => return Err(ApiError::BadRequest(RANGE_TOO_LARGE)),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(estimates.iter().map(FeeEstimateResponse::from).collect()))
}

// ── /health ──────────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "OK"
}
