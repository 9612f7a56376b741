//! Stockroom - inventory tracking service
//!
//! The HTTP listener comes up before MongoDB is reachable. A background
//! supervisor establishes the connection with backoff and cool-down, and
//! every data-dependent request sees a uniform "not ready yet" 503 until it
//! is up.
//!
//! ## Modules
//!
//! - **lifecycle**: connection state, supervisor, readiness broker, gate,
//!   data-access proxy, and the idempotent seeder (generic over the handle)
//! - **db**: the MongoDB handle, schemas, repositories, and admin seeding
//! - **routes** / **server**: hyper HTTP surface

pub mod auth;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, StockroomError};
