//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo. The listener binds before anything touches
//! the database; the connection supervisor is started once the port is open
//! and is never awaited by the server.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::db::{admin_record, MongoClient, MongoOpener, Repositories};
use crate::lifecycle::{
    ConnectionSupervisor, DataProxy, GateDecision, HandleOpener, IdempotentSeeder,
    ReadinessBroker, ReadinessGate, Seeder,
};
use crate::routes::{self, json_response};
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub supervisor: Arc<ConnectionSupervisor<MongoClient>>,
    pub broker: ReadinessBroker<MongoClient>,
    pub gate: ReadinessGate<MongoClient>,
    pub repositories: Repositories,
}

impl AppState {
    /// Wire the lifecycle against the configured MongoDB target. Nothing is
    /// opened until `run` starts the supervisor.
    pub fn new(args: Args) -> Result<Self> {
        let record = admin_record(&args.admin_email, args.admin_password.as_deref())?;
        let opener = MongoOpener::new(args.mongodb_uri.as_str(), args.mongodb_db.as_str());
        Ok(Self::with_parts(
            args,
            Arc::new(opener),
            Arc::new(IdempotentSeeder::new(record)),
        ))
    }

    pub fn with_parts(
        args: Args,
        opener: Arc<dyn HandleOpener<MongoClient>>,
        seeder: Arc<dyn Seeder<MongoClient>>,
    ) -> Self {
        let supervisor = ConnectionSupervisor::new(args.supervisor_config(), opener, seeder);
        let broker = ReadinessBroker::new(Arc::clone(&supervisor));
        let gate = ReadinessGate::new(broker.clone());
        let repositories = Repositories::new(DataProxy::new(broker.clone(), args.wait_timeout()));

        Self {
            args,
            supervisor,
            broker,
            gate,
            repositories,
        }
    }
}

/// Bind, start the connection supervisor, then serve forever
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!("Stockroom listening on {}", listener.local_addr()?);

    state.supervisor.start();

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    Ok(route(&state, &method, &path).await)
}

/// Dispatch a request by method and path
pub async fn route(state: &AppState, method: &Method, path: &str) -> Response<Full<Bytes>> {
    if *method == Method::OPTIONS {
        return preflight_response();
    }

    if path.starts_with("/api/") {
        if let GateDecision::Reject(rejection) = state.gate.check() {
            return routes::rejection_response(&rejection);
        }
        return match (method, path) {
            (&Method::GET, "/api/stats") => routes::stats(&state.repositories).await,
            _ => not_found_response(path),
        };
    }

    match (method, path) {
        (&Method::GET, "/health") => routes::health_check(&state.broker),
        (&Method::GET, "/health/ready") => routes::readiness_check(&state.broker),
        (&Method::GET, "/version") => routes::version_info(),
        _ => not_found_response(path),
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = json_response(StatusCode::NO_CONTENT, String::new());
    let headers = response.headers_mut();
    headers.remove(hyper::header::CONTENT_TYPE);
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_HEADERS,
        hyper::header::HeaderValue::from_static("*"),
    );
    headers.insert(
        hyper::header::ACCESS_CONTROL_ALLOW_METHODS,
        hyper::header::HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    response
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });
    json_response(StatusCode::NOT_FOUND, body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{NoopSeeder, RETRY_AFTER_SECS};
    use crate::types::StockroomError;
    use async_trait::async_trait;
    use clap::Parser;
    use http_body_util::BodyExt;

    struct Unreachable;

    #[async_trait]
    impl HandleOpener<MongoClient> for Unreachable {
        async fn open(&self) -> Result<MongoClient> {
            Err(StockroomError::Connect("server selection timeout".into()))
        }
    }

    fn state() -> AppState {
        let args = Args::try_parse_from(["stockroom"]).unwrap();
        AppState::with_parts(args, Arc::new(Unreachable), Arc::new(NoopSeeder))
    }

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_gated_before_connect() {
        let state = state();

        let response = route(&state, &Method::GET, "/api/stats").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()[hyper::header::RETRY_AFTER],
            RETRY_AFTER_SECS.to_string().as_str()
        );
        let json = body_json(response).await;
        assert_eq!(json["message"], "Database is not ready yet");
        assert_eq!(json["state"], "disconnected");

        // Unknown API paths are gated too
        let response = route(&state, &Method::GET, "/api/items").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_probes_answer_without_database() {
        let state = state();

        let response = route(&state, &Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = route(&state, &Method::GET, "/health/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "ready": false, "database": "disconnected" })
        );
    }

    #[tokio::test]
    async fn test_preflight_and_not_found() {
        let state = state();

        let response = route(&state, &Method::OPTIONS, "/api/stats").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = route(&state, &Method::GET, "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["path"], "/nope");
    }

    #[tokio::test]
    async fn test_serve_binds_before_database() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let state = Arc::new(state());
        assert!(!state.supervisor.is_running());

        let server = tokio::spawn(serve(listener, Arc::clone(&state)));
        while !state.supervisor.is_running() {
            tokio::task::yield_now().await;
        }
        assert!(!state.broker.is_ready());
        server.abort();
    }
}
