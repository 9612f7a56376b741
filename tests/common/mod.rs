//! In-memory doubles for driving the connection lifecycle in tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::Instant;

use stockroom::lifecycle::{
    BackoffPolicy, ConnectionSupervisor, HandleOpener, Lifecycle, SeedRecord, SeedStore,
    SupervisorConfig,
};
use stockroom::{Result, StockroomError};

/// A seedable in-memory "database" used as the handle type
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<String, SeedRecord>>>,
    inserts: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn inserts(&self) -> u32 {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeedStore for MemoryStore {
    async fn insert_if_absent(&self, record: &SeedRecord) -> Result<bool> {
        tokio::task::yield_now().await;
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&record.identifier) {
            return Ok(false);
        }
        rows.insert(record.identifier.clone(), record.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

pub fn admin() -> SeedRecord {
    SeedRecord {
        identifier: "admin@stockroom.local".into(),
        display_name: "Administrator".into(),
        role: "admin".into(),
        password_hash: "$argon2id$v=19$test".into(),
    }
}

/// Opener whose every attempt is decided by the test.
///
/// Each `open` announces its call number on `started`, then waits for the
/// next scripted outcome.
pub struct ScriptedOpener {
    calls: AtomicU32,
    started: mpsc::UnboundedSender<u32>,
    outcomes: AsyncMutex<mpsc::UnboundedReceiver<std::result::Result<MemoryStore, String>>>,
}

pub struct Script {
    pub started: mpsc::UnboundedReceiver<u32>,
    pub outcomes: mpsc::UnboundedSender<std::result::Result<MemoryStore, String>>,
}

impl ScriptedOpener {
    pub fn new() -> (Arc<Self>, Script) {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let opener = Arc::new(Self {
            calls: AtomicU32::new(0),
            started: started_tx,
            outcomes: AsyncMutex::new(outcome_rx),
        });
        (
            opener,
            Script {
                started: started_rx,
                outcomes: outcome_tx,
            },
        )
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HandleOpener<MemoryStore> for ScriptedOpener {
    async fn open(&self) -> Result<MemoryStore> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.started.send(call);
        match self.outcomes.lock().await.recv().await {
            Some(Ok(store)) => Ok(store),
            Some(Err(message)) => Err(StockroomError::Connect(message)),
            None => Err(StockroomError::Connect("script ended".into())),
        }
    }
}

/// Opener with a fixed latency and a fixed result, recording call times
pub struct TimedOpener {
    latency: Duration,
    store: Option<MemoryStore>,
    calls: Mutex<Vec<Instant>>,
}

impl TimedOpener {
    pub fn succeeding(latency: Duration, store: MemoryStore) -> Arc<Self> {
        Arc::new(Self {
            latency,
            store: Some(store),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            store: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HandleOpener<MemoryStore> for TimedOpener {
    async fn open(&self) -> Result<MemoryStore> {
        self.calls.lock().unwrap().push(Instant::now());
        tokio::time::sleep(self.latency).await;
        self.store
            .clone()
            .ok_or_else(|| StockroomError::Connect("ECONNREFUSED 127.0.0.1:27017".into()))
    }
}

/// Retry policy with deterministic delays
pub fn fast_config(max_attempts: u32, cooldown: Duration) -> SupervisorConfig {
    SupervisorConfig {
        max_attempts,
        cooldown,
        backoff: BackoffPolicy {
            base: Duration::from_millis(100),
            factor: 2.0,
            cap: Duration::from_secs(1),
            jitter: Duration::ZERO,
        },
    }
}

/// Wait for the published lifecycle to reach `wanted`
pub async fn wait_for_state(supervisor: &ConnectionSupervisor<MemoryStore>, wanted: Lifecycle) {
    let mut rx = supervisor.subscribe();
    while rx.borrow_and_update().state.lifecycle != wanted {
        rx.changed().await.unwrap();
    }
}
