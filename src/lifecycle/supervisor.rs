//! Connection supervisor
//!
//! Owns the background retry loop and is the single writer of the
//! connection state. One connect sequence (up to `max_attempts` tries with
//! backoff) runs as the shared Pending Attempt; waiters attach to it instead
//! of opening their own connections. When a sequence is exhausted the loop
//! cools down and starts over from attempt 1, for the life of the process.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::backoff::BackoffPolicy;
use super::seeder::Seeder;
use super::state::{Connected, ConnectionState, Lifecycle, Snapshot};
use crate::types::Result;

/// Driver-specific "open a database handle" operation
#[async_trait]
pub trait HandleOpener<H>: Send + Sync + 'static {
    /// Open and verify a handle. Errors are retried by the supervisor.
    async fn open(&self) -> Result<H>;

    /// Human-readable target for logs (never includes credentials)
    fn describe(&self) -> String {
        "database".to_string()
    }
}

/// Retry policy for the supervisor loop
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Attempts per sequence before cooling down
    pub max_attempts: u32,
    /// Pause between an exhausted sequence and the next one
    pub cooldown: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            cooldown: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Result of one connect sequence
#[derive(Debug, Clone)]
pub enum CycleOutcome<H> {
    Connected(Connected<H>),
    /// Every attempt in the sequence failed
    Exhausted { attempts: u32, last_error: String },
}

/// The shared in-flight connect sequence
pub type PendingAttempt<H> = Shared<BoxFuture<'static, CycleOutcome<H>>>;

/// Supervises the lazily established database connection
pub struct ConnectionSupervisor<H> {
    config: SupervisorConfig,
    opener: Arc<dyn HandleOpener<H>>,
    seeder: Arc<dyn Seeder<H>>,
    published: watch::Sender<Snapshot<H>>,
    /// At most one Pending Attempt exists; only `begin_sequence` fills it
    pending: Mutex<Option<PendingAttempt<H>>>,
    /// Whether the background loop is alive (including cool-down)
    running: AtomicBool,
    generation: AtomicU64,
}

impl<H> ConnectionSupervisor<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new(
        config: SupervisorConfig,
        opener: Arc<dyn HandleOpener<H>>,
        seeder: Arc<dyn Seeder<H>>,
    ) -> Arc<Self> {
        let (published, _) = watch::channel(Snapshot::default());
        Arc::new(Self {
            config,
            opener,
            seeder,
            published,
            pending: Mutex::new(None),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        })
    }

    /// Start the background loop without waiting for it.
    ///
    /// Returns `false` (and does nothing) if the loop is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("Connection supervisor already running");
            return false;
        }

        info!(target_db = %self.opener.describe(), "Starting connection supervisor");
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            supervisor.run().await;
        });
        true
    }

    /// Drop the handle of `generation` and connect again.
    ///
    /// Reports about an older generation are ignored, so several callers
    /// observing the same broken handle trigger a single reconnect.
    pub fn reconnect(self: &Arc<Self>, generation: u64) -> bool {
        let mut dropped = false;
        self.published.send_if_modified(|snapshot| {
            let is_current =
                snapshot.current.as_ref().map(|c| c.generation) == Some(generation);
            if !is_current {
                return false;
            }
            snapshot.current = None;
            snapshot.state.lifecycle = Lifecycle::Disconnected;
            snapshot.state.attempt = 0;
            dropped = true;
            true
        });

        if dropped {
            warn!(generation, "Database handle reported lost, reconnecting");
            self.start();
        }
        dropped
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.published.borrow().state.clone()
    }

    /// Full published snapshot (state and handle)
    pub fn snapshot(&self) -> Snapshot<H> {
        self.published.borrow().clone()
    }

    /// Handle of the live connection, if any
    pub fn current(&self) -> Option<Connected<H>> {
        self.published.borrow().ready_handle()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<H>> {
        self.published.subscribe()
    }

    /// The in-flight connect sequence, if one is running
    pub fn pending(&self) -> Option<PendingAttempt<H>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn run(self: Arc<Self>) {
        loop {
            let attempt = self.begin_sequence();
            let outcome = attempt.await;
            self.finish_sequence();

            match outcome {
                CycleOutcome::Connected(connected) => {
                    self.seed_once(&connected.handle).await;

                    self.running.store(false, Ordering::Release);
                    // A reconnect may have raced the seeding step; if it found the
                    // loop still marked running, pick its request up here.
                    if self.current().is_some() || self.running.swap(true, Ordering::AcqRel) {
                        return;
                    }
                }
                CycleOutcome::Exhausted {
                    attempts,
                    last_error,
                } => {
                    error!(
                        attempts,
                        cooldown_ms = self.config.cooldown.as_millis() as u64,
                        error = %last_error,
                        "Database connection retries exhausted, cooling down"
                    );
                    self.published.send_modify(|snapshot| {
                        snapshot.state.lifecycle = Lifecycle::Disconnected;
                        snapshot.state.attempt = 0;
                    });
                    tokio::time::sleep(self.config.cooldown).await;
                    info!("Cool-down elapsed, restarting database connection attempts");
                }
            }
        }
    }

    fn begin_sequence(self: &Arc<Self>) -> PendingAttempt<H> {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }

        let supervisor = Arc::clone(self);
        let attempt = async move { supervisor.connect_with_retries().await }
            .boxed()
            .shared();
        *slot = Some(attempt.clone());
        attempt
    }

    fn finish_sequence(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    async fn connect_with_retries(&self) -> CycleOutcome<H> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            self.published.send_modify(|snapshot| {
                snapshot.state.lifecycle = Lifecycle::Connecting;
                snapshot.state.attempt = attempt;
            });
            debug!(attempt, max_attempts, "Opening database connection");

            match self.opener.open().await {
                Ok(handle) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    let connected = Connected { generation, handle };
                    self.published.send_modify(|snapshot| {
                        snapshot.state.lifecycle = Lifecycle::Connected;
                        snapshot.state.last_error = None;
                        snapshot.current = Some(connected.clone());
                    });
                    info!(attempt, generation, "Database connected");
                    return CycleOutcome::Connected(connected);
                }
                Err(e) => {
                    last_error = e.to_string();
                    self.published.send_modify(|snapshot| {
                        snapshot.state.lifecycle = Lifecycle::Error;
                        snapshot.state.last_error = Some(last_error.clone());
                    });

                    if attempt < max_attempts {
                        let delay = self.config.backoff.delay(attempt);
                        warn!(
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Database connection attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(attempt, max_attempts, error = %e, "Database connection attempt failed");
                    }
                }
            }
        }

        CycleOutcome::Exhausted {
            attempts: max_attempts,
            last_error,
        }
    }

    async fn seed_once(&self, handle: &H) {
        let seeded = self.published.borrow().state.seeded;
        if seeded {
            return;
        }
        let outcome = self.seeder.seed(handle).await;
        debug!(?outcome, "Seeding finished");
        self.published
            .send_modify(|snapshot| snapshot.state.seeded = true);
    }
}
