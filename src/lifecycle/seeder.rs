//! One-time default record seeding
//!
//! Runs after the first successful connection. The insert is conflict
//! tolerant: concurrently booting instances may all try, exactly one write
//! lands, and the rest see "already present". Failures are logged here and
//! never reach the supervisor.

use async_trait::async_trait;
use tracing::{error, info};

use crate::types::{Result, StockroomError};

/// The record seeded on first connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRecord {
    /// Unique identifying field (e.g. the admin e-mail)
    pub identifier: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
}

/// Store-side insert-if-absent keyed on `SeedRecord::identifier`
#[async_trait]
pub trait SeedStore: Send + Sync {
    /// Returns `true` when this call inserted the record, `false` when it
    /// already existed (including losing a concurrent insert race).
    async fn insert_if_absent(&self, record: &SeedRecord) -> Result<bool>;
}

/// What a seeding run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted,
    AlreadyPresent,
    Failed,
    Skipped,
}

/// Hook the supervisor runs once after its first successful connect
#[async_trait]
pub trait Seeder<H>: Send + Sync + 'static {
    async fn seed(&self, handle: &H) -> SeedOutcome;
}

/// Seeder for deployments with nothing to seed
pub struct NoopSeeder;

#[async_trait]
impl<H: Sync + 'static> Seeder<H> for NoopSeeder {
    async fn seed(&self, _handle: &H) -> SeedOutcome {
        SeedOutcome::Skipped
    }
}

/// Seeds a single record through the handle's `SeedStore`
pub struct IdempotentSeeder {
    record: SeedRecord,
}

impl IdempotentSeeder {
    pub fn new(record: SeedRecord) -> Self {
        Self { record }
    }
}

#[async_trait]
impl<H> Seeder<H> for IdempotentSeeder
where
    H: SeedStore + 'static,
{
    async fn seed(&self, handle: &H) -> SeedOutcome {
        match handle.insert_if_absent(&self.record).await {
            Ok(true) => {
                info!(identifier = %self.record.identifier, "Seeded default {} account", self.record.role);
                SeedOutcome::Inserted
            }
            Ok(false) => {
                info!(identifier = %self.record.identifier, "Default account already present, nothing to seed");
                SeedOutcome::AlreadyPresent
            }
            Err(e) => {
                let err = StockroomError::Seed(e.to_string());
                error!(identifier = %self.record.identifier, "{}", err);
                SeedOutcome::Failed
            }
        }
    }
}
