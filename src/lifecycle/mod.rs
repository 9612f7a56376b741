//! Lazy database connection lifecycle
//!
//! The HTTP listener comes up before the database does. This module
//! supervises the connection in the background and gives request paths a
//! uniform "not ready yet" contract until it is up.
//!
//! ## Components
//!
//! - **state**: lifecycle enum and the published snapshot
//! - **backoff**: attempt number to retry delay
//! - **supervisor**: the retry loop, single writer of the state
//! - **broker**: readiness queries and bounded waits on the Pending Attempt
//! - **proxy**: data access that waits for readiness before delegating
//! - **gate**: synchronous request-path check producing the 503 rejection
//! - **seeder**: one-time, conflict-tolerant default record insert

pub mod backoff;
pub mod broker;
pub mod gate;
pub mod proxy;
pub mod seeder;
pub mod state;
pub mod supervisor;

pub use backoff::BackoffPolicy;
pub use broker::ReadinessBroker;
pub use gate::{GateDecision, ReadinessGate, Rejection, RETRY_AFTER_SECS};
pub use proxy::{DataProxy, GenerationalBinding, DEFAULT_WAIT_TIMEOUT};
pub use seeder::{IdempotentSeeder, NoopSeeder, SeedOutcome, SeedRecord, SeedStore, Seeder};
pub use state::{Connected, ConnectionState, Lifecycle, Snapshot};
pub use supervisor::{
    ConnectionSupervisor, CycleOutcome, HandleOpener, PendingAttempt, SupervisorConfig,
};
