//! Health check endpoints
//!
//! - `/health` is the liveness probe: always 200 while the process serves
//!   requests, with the database state for information.
//! - `/health/ready` is the readiness probe: 200 only once the database is
//!   connected, 503 before that.
//!
//! Neither probe ever waits on the database.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::lifecycle::{Lifecycle, ReadinessBroker};
use crate::routes::json_response;

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub state: Lifecycle,
    pub connected: bool,
    pub error: Option<String>,
}

/// Liveness body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when the database is connected, `degraded` otherwise
    pub status: &'static str,
    pub database: DatabaseHealth,
    pub timestamp: String,
}

/// Readiness body
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub database: Lifecycle,
}

pub fn build_health_response<H>(broker: &ReadinessBroker<H>) -> HealthResponse
where
    H: Clone + Send + Sync + 'static,
{
    let snapshot = broker.supervisor().snapshot();
    let connected = snapshot.ready_handle().is_some();
    let state = snapshot.state;

    HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        database: DatabaseHealth {
            state: state.lifecycle,
            connected,
            error: state.last_error,
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Handle liveness probe (/health)
pub fn health_check<H>(broker: &ReadinessBroker<H>) -> Response<Full<Bytes>>
where
    H: Clone + Send + Sync + 'static,
{
    let response = build_health_response(broker);
    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"status":"degraded","error":"Serialization failed"}"#.to_string());

    json_response(StatusCode::OK, body)
}

/// Handle readiness probe (/health/ready)
pub fn readiness_check<H>(broker: &ReadinessBroker<H>) -> Response<Full<Bytes>>
where
    H: Clone + Send + Sync + 'static,
{
    let snapshot = broker.supervisor().snapshot();
    let ready = snapshot.ready_handle().is_some();
    let response = ReadinessResponse {
        ready,
        database: snapshot.state.lifecycle,
    };
    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"ready":false}"#.to_string());

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_response(status, body)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "stockroom",
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    json_response(StatusCode::OK, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ConnectionSupervisor, HandleOpener, NoopSeeder, SupervisorConfig};
    use crate::types::{Result, StockroomError};
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use std::sync::Arc;

    struct Refused;

    #[async_trait]
    impl HandleOpener<()> for Refused {
        async fn open(&self) -> Result<()> {
            Err(StockroomError::Connect("ECONNREFUSED".into()))
        }
    }

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn broker() -> ReadinessBroker<()> {
        let supervisor = ConnectionSupervisor::<()>::new(
            SupervisorConfig::default(),
            Arc::new(Refused),
            Arc::new(NoopSeeder),
        );
        ReadinessBroker::new(supervisor)
    }

    #[tokio::test]
    async fn test_liveness_is_ok_while_disconnected() {
        let response = health_check(&broker());
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["database"]["state"], "disconnected");
        assert_eq!(json["database"]["connected"], false);
        assert_eq!(json["database"]["error"], serde_json::Value::Null);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_reports_error_state() {
        let broker = broker();
        broker.supervisor().start();
        let mut rx = broker.supervisor().subscribe();
        while broker.state().lifecycle != Lifecycle::Error {
            rx.changed().await.unwrap();
        }

        let response = readiness_check(&broker);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({ "ready": false, "database": "error" }));

        let json = body_json(health_check(&broker)).await;
        assert_eq!(json["database"]["error"], "Connect failed: ECONNREFUSED");
    }

    struct Accepting;

    #[async_trait]
    impl HandleOpener<()> for Accepting {
        async fn open(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_fields_agree_across_reconnect() {
        let supervisor = ConnectionSupervisor::<()>::new(
            SupervisorConfig::default(),
            Arc::new(Accepting),
            Arc::new(NoopSeeder),
        );
        let broker = ReadinessBroker::new(Arc::clone(&supervisor));
        supervisor.start();
        let first = broker.await_handle(std::time::Duration::from_secs(1)).await.unwrap();

        let json = body_json(readiness_check(&broker)).await;
        assert_eq!(json, serde_json::json!({ "ready": true, "database": "connected" }));
        let health = build_health_response(&broker);
        assert_eq!((health.status, health.database.connected), ("ok", true));

        assert!(supervisor.reconnect(first.generation));
        let response = readiness_check(&broker);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({ "ready": false, "database": "disconnected" }));
        let health = build_health_response(&broker);
        assert_eq!(health.database.state, Lifecycle::Disconnected);
        assert_eq!((health.status, health.database.connected), ("degraded", false));
    }

    #[tokio::test]
    async fn test_version_info() {
        let json = body_json(version_info()).await;
        assert_eq!(json["service"], "stockroom");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
