//! Readiness broker
//!
//! Hands out the database handle to request paths. Waiters coalesce onto the
//! supervisor's Pending Attempt, so any number of concurrent callers cause a
//! single connect. The broker never starts an attempt itself.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::state::{Connected, ConnectionState};
use super::supervisor::{ConnectionSupervisor, CycleOutcome};
use crate::types::{Result, StockroomError};

/// Poll interval while no attempt is in flight (e.g. during cool-down)
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ReadinessBroker<H> {
    supervisor: Arc<ConnectionSupervisor<H>>,
}

impl<H> Clone for ReadinessBroker<H> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
        }
    }
}

impl<H> ReadinessBroker<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new(supervisor: Arc<ConnectionSupervisor<H>>) -> Self {
        Self { supervisor }
    }

    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor<H>> {
        &self.supervisor
    }

    /// Connected and holding a handle. Never blocks.
    pub fn is_ready(&self) -> bool {
        self.supervisor.current().is_some()
    }

    /// The live handle, if connected. Never blocks.
    pub fn current_handle(&self) -> Option<Connected<H>> {
        self.supervisor.current()
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Wait up to `timeout` for a live handle.
    ///
    /// A failed shared attempt is not the caller's failure: the caller keeps
    /// waiting for the next attempt until its own bound elapses, then gets
    /// `StockroomError::NotReady`.
    pub async fn await_handle(&self, timeout: Duration) -> Result<Connected<H>> {
        if let Some(connected) = self.current_handle() {
            return Ok(connected);
        }

        match tokio::time::timeout(timeout, self.wait_for_handle()).await {
            Ok(connected) => Ok(connected),
            Err(_) => {
                let state = self.state();
                debug!(
                    state = %state.lifecycle,
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for database"
                );
                Err(StockroomError::NotReady {
                    state: state.lifecycle,
                    error: state.last_error,
                })
            }
        }
    }

    async fn wait_for_handle(&self) -> Connected<H> {
        loop {
            if let Some(connected) = self.current_handle() {
                return connected;
            }

            match self.supervisor.pending() {
                Some(attempt) => {
                    if let CycleOutcome::Connected(_) = attempt.await {
                        // A reconnect may already have dropped the handle this
                        // attempt produced; only hand out the live one.
                        if let Some(connected) = self.current_handle() {
                            return connected;
                        }
                    }
                    // The slot may still hold the resolved attempt until the
                    // supervisor clears it; don't spin on it.
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                None => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }
}
