//! Data-access proxy
//!
//! Every repository reaches the database through here. Each call re-resolves
//! readiness, so a handle dropped by a reconnect is never reused; bindings
//! derived from a handle are cached per generation.

use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;

use super::broker::ReadinessBroker;
use super::state::Connected;
use crate::types::{Result, StockroomError};

/// Default bound on how long a data call waits for the database
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct DataProxy<H> {
    broker: ReadinessBroker<H>,
    timeout: Duration,
}

impl<H> Clone for DataProxy<H> {
    fn clone(&self) -> Self {
        Self {
            broker: self.broker.clone(),
            timeout: self.timeout,
        }
    }
}

impl<H> DataProxy<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new(broker: ReadinessBroker<H>, timeout: Duration) -> Self {
        Self { broker, timeout }
    }

    /// Wait (bounded) for the live handle. Fails with `NotReady` on timeout.
    pub async fn resolve(&self) -> Result<Connected<H>> {
        self.broker.await_handle(self.timeout).await
    }

    /// Run `op` against the live handle; its result is returned unchanged.
    pub async fn with_handle<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(H) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let connected = self.resolve().await?;
        let result = op(connected.handle).await;
        self.observe(connected.generation, result)
    }

    /// Pass `result` through, reporting the handle of `generation` as lost
    /// if the operation failed with `ConnectionLost`.
    pub fn observe<T>(&self, generation: u64, result: Result<T>) -> Result<T> {
        if let Err(StockroomError::ConnectionLost(_)) = &result {
            self.report_lost(generation);
        }
        result
    }

    /// Tell the supervisor the handle of `generation` is broken.
    pub fn report_lost(&self, generation: u64) -> bool {
        self.broker.supervisor().reconnect(generation)
    }
}

/// Something built from a handle (e.g. a typed collection), cached for as
/// long as that handle's generation is the live one.
pub struct GenerationalBinding<H, B> {
    proxy: DataProxy<H>,
    slot: RwLock<Option<(u64, B)>>,
}

impl<H, B> GenerationalBinding<H, B>
where
    H: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync,
{
    pub fn new(proxy: DataProxy<H>) -> Self {
        Self {
            proxy,
            slot: RwLock::new(None),
        }
    }

    pub fn proxy(&self) -> &DataProxy<H> {
        &self.proxy
    }

    /// Resolve readiness and return the binding for the live generation,
    /// running `bind` only when the cached one belongs to an older handle.
    pub async fn get_or_bind<F, Fut>(&self, bind: F) -> Result<(u64, B)>
    where
        F: FnOnce(H) -> Fut,
        Fut: Future<Output = Result<B>>,
    {
        let connected = self.proxy.resolve().await?;

        if let Some((generation, bound)) = self.slot.read().await.as_ref() {
            if *generation == connected.generation {
                return Ok((*generation, bound.clone()));
            }
        }

        let bound = self
            .proxy
            .observe(connected.generation, bind(connected.handle).await)?;
        *self.slot.write().await = Some((connected.generation, bound.clone()));
        Ok((connected.generation, bound))
    }
}
