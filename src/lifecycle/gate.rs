//! Readiness gate for data-dependent request paths
//!
//! A cheap synchronous check run before any route touches the database.

use serde::Serialize;

use super::broker::ReadinessBroker;
use super::state::Lifecycle;

/// Suggested client retry interval when the database is not ready
pub const RETRY_AFTER_SECS: u64 = 5;

/// Message carried by every "not ready" rejection
pub const NOT_READY_MESSAGE: &str = "Database is not ready yet";

/// Body of the 503 returned while the database is unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub message: &'static str,
    pub state: Lifecycle,
    pub error: Option<String>,
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

impl Rejection {
    pub fn new(state: Lifecycle, error: Option<String>) -> Self {
        Self {
            message: NOT_READY_MESSAGE,
            state,
            error,
            retry_after: RETRY_AFTER_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Reject(Rejection),
}

pub struct ReadinessGate<H> {
    broker: ReadinessBroker<H>,
}

impl<H> Clone for ReadinessGate<H> {
    fn clone(&self) -> Self {
        Self {
            broker: self.broker.clone(),
        }
    }
}

impl<H> ReadinessGate<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new(broker: ReadinessBroker<H>) -> Self {
        Self { broker }
    }

    pub fn check(&self) -> GateDecision {
        if self.broker.is_ready() {
            return GateDecision::Allow;
        }
        let state = self.broker.state();
        GateDecision::Reject(Rejection::new(state.lifecycle, state.last_error))
    }
}
