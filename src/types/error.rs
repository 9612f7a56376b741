//! Error types for Stockroom

use hyper::StatusCode;

use crate::lifecycle::Lifecycle;

/// Main error type for Stockroom operations
#[derive(Debug, thiserror::Error)]
pub enum StockroomError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The database did not become ready within the caller's bound
    #[error("Database is not ready yet (state: {state})")]
    NotReady {
        state: Lifecycle,
        error: Option<String>,
    },

    /// A single connect attempt failed; retried by the supervisor
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Default record seeding failed; logged, never propagated past the seeder
    #[error("Seeding failed: {0}")]
    Seed(String),

    #[error("Database error: {0}")]
    Database(String),

    /// The driver lost its connection mid-operation; the handle is replaced
    #[error("Database connection lost: {0}")]
    ConnectionLost(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl StockroomError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Connect(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Seed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConnectionLost(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether this is the uniform "database not ready" error
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

impl From<std::io::Error> for StockroomError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StockroomError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for StockroomError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for StockroomError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for Stockroom operations
pub type Result<T> = std::result::Result<T, StockroomError>;
