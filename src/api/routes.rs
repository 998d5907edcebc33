//! API route definitions
//!
//! - /api/v1/status - pipeline status, counters, latest record
//! - /api/v1/records - latest persisted records
//! - /api/v1/records/range - records between two timestamps
//! - /api/v1/stats - risk distribution and store info

use axum::{routing::get, Router};

use super::handlers::{self, DashboardState};

pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/records", get(handlers::get_records))
        .route("/records/range", get(handlers::get_records_range))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}

/// Liveness at root level
pub fn health_routes() -> Router {
    Router::new().route("/health", get(handlers::get_health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GatewayStatus;
    use crate::storage::{InMemoryRecordStore, RecordStore};
    use crate::types::{parse_timestamp, EnrichedRecord, RawReading, RiskVerdict};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn create_test_state() -> DashboardState {
        let store = InMemoryRecordStore::new();
        for (hour, status) in [(0, RiskVerdict::Safe), (1, RiskVerdict::Warning), (2, RiskVerdict::Safe)] {
            let reading = RawReading {
                timestamp: parse_timestamp(&format!("2025-01-01 0{hour}:00:00")).unwrap(),
                temperature: 29.0,
                ph: 7.2,
                dissolved_oxygen: 6.1,
                turbidity: 12.0,
            };
            store
                .insert(&EnrichedRecord::new(&reading, None, status, None, status))
                .unwrap();
        }
        DashboardState::new(
            Arc::new(RwLock::new(GatewayStatus::new("pond-a", 25))),
            Arc::new(store),
        )
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = health_routes()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_route() {
        let (status, body) = get_json("/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deployment"], "pond-a");
        assert_eq!(body["min_history"], 25);
        assert_eq!(body["forecasting"], false);
    }

    #[tokio::test]
    async fn test_records_route_limits_newest_first() {
        let (status, body) = get_json("/records?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["records"][0]["timestamp"], "2025-01-01 02:00:00");
        assert_eq!(body["records"][0]["do"], 6.1);
    }

    #[tokio::test]
    async fn test_range_route() {
        let (status, body) =
            get_json("/records/range?start=2025-01-01%2001:00:00&end=2025-01-01%2002:00:00").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["records"][0]["status"], "Warning");
    }

    #[tokio::test]
    async fn test_range_route_rejects_bad_timestamp() {
        let (status, body) = get_json("/records/range?start=yesterday&end=2025-01-01%2002:00:00").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_stats_route() {
        let (status, body) = get_json("/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statistics"][0]["status"], "Safe");
        assert_eq!(body["statistics"][0]["count"], 2);
        assert_eq!(body["store"]["total_records"], 3);
        assert_eq!(body["store"]["backend"], "InMemory");
    }
}
