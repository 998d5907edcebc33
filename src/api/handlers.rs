//! API route handlers
//!
//! Read-only views over the gateway:
//! - liveness
//! - pipeline status, counters and latest record
//! - persisted records (latest N or a time range)
//! - risk statistics and store info

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use super::envelope::ApiErrorResponse;
use crate::config::defaults::{API_DEFAULT_LIMIT, API_MAX_LIMIT};
use crate::pipeline::GatewayStatus;
use crate::storage::{RecordStore, RiskStatistic, StoreInfo, StoredRecord};
use crate::types;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Pipeline status written by the processing loop
    pub status: Arc<RwLock<GatewayStatus>>,
    pub store: Arc<dyn RecordStore>,
}

impl DashboardState {
    pub fn new(status: Arc<RwLock<GatewayStatus>>, store: Arc<dyn RecordStore>) -> Self {
        Self { status, store }
    }
}

// ============================================================================
// Health / Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub gateway: GatewayStatus,
    pub uptime_secs: u64,
    pub forecasting: bool,
}

pub async fn get_status(State(state): State<DashboardState>) -> Json<StatusResponse> {
    let gateway = state.status.read().await.clone();
    Json(StatusResponse {
        uptime_secs: gateway.uptime_secs(),
        forecasting: gateway.forecasting(),
        gateway,
    })
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<StoredRecord>,
}

impl From<Vec<StoredRecord>> for RecordsResponse {
    fn from(records: Vec<StoredRecord>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

/// Newest records first; `limit` defaults to 100 and is capped at 1000.
pub async fn get_records(
    State(state): State<DashboardState>,
    Query(query): Query<RecordsQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(API_DEFAULT_LIMIT).clamp(1, API_MAX_LIMIT);
    match state.store.latest(limit) {
        Ok(records) => Json(RecordsResponse::from(records)).into_response(),
        Err(e) => {
            warn!("Failed to read records: {}", e);
            ApiErrorResponse::internal(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

/// Records with `start <= timestamp <= end`, oldest first.
pub async fn get_records_range(
    State(state): State<DashboardState>,
    Query(query): Query<RangeQuery>,
) -> Response {
    let (start, end) = match (
        types::parse_timestamp(&query.start),
        types::parse_timestamp(&query.end),
    ) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(_), _) => return ApiErrorResponse::bad_request(format!("invalid start '{}'", query.start)),
        (_, Err(_)) => return ApiErrorResponse::bad_request(format!("invalid end '{}'", query.end)),
    };
    match state.store.range(start, end) {
        Ok(records) => Json(RecordsResponse::from(records)).into_response(),
        Err(e) => {
            warn!("Failed to read record range: {}", e);
            ApiErrorResponse::internal(e.to_string())
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub statistics: Vec<RiskStatistic>,
    pub store: StoreInfo,
    pub size_mb: f64,
}

pub async fn get_stats(State(state): State<DashboardState>) -> Response {
    let result = state
        .store
        .risk_statistics()
        .and_then(|statistics| state.store.info().map(|info| (statistics, info)));
    match result {
        Ok((statistics, store)) => Json(StatsResponse {
            size_mb: store.size_mb(),
            statistics,
            store,
        })
        .into_response(),
        Err(e) => {
            warn!("Failed to compute statistics: {}", e);
            ApiErrorResponse::internal(e.to_string())
        }
    }
}
