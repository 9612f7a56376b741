//! Data-dependent API routes
//!
//! Everything under `/api/` sits behind the readiness gate. The handlers
//! here only run once the gate allows the request.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, RETRY_AFTER};
use hyper::{Response, StatusCode};
use tracing::{error, warn};

use crate::db::Repositories;
use crate::lifecycle::{Rejection, RETRY_AFTER_SECS};
use crate::routes::json_response;
use crate::types::StockroomError;

/// 503 carrying the gate's rejection body and a `Retry-After` header
pub fn rejection_response(rejection: &Rejection) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(rejection).unwrap_or_else(|_| {
        format!(
            r#"{{"message":"{}","retryAfter":{}}}"#,
            rejection.message, rejection.retry_after
        )
    });

    let mut response = json_response(StatusCode::SERVICE_UNAVAILABLE, body);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
    response
}

/// Map a handler error to a response. A proxy timeout answers exactly like
/// the gate would.
pub fn error_response(err: &StockroomError) -> Response<Full<Bytes>> {
    match err {
        StockroomError::NotReady { state, error } => {
            warn!(state = %state, "Request timed out waiting for database");
            rejection_response(&Rejection::new(*state, error.clone()))
        }
        other => {
            let status = other.status_code();
            if status.is_server_error() {
                error!("Request failed: {}", other);
            }
            let body = serde_json::json!({ "error": other.to_string() });
            json_response(status, body.to_string())
        }
    }
}

/// Handle `/api/stats`: document counts per collection
pub async fn stats(repositories: &Repositories) -> Response<Full<Bytes>> {
    match repositories.counts().await {
        Ok(counts) => match serde_json::to_string(&counts) {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(e) => error_response(&StockroomError::from(e)),
        },
        Err(e) => error_response(&e),
    }
}
