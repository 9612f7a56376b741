//! Default administrative account seeding
//!
//! The insert is a `$setOnInsert` upsert keyed on the user's unique
//! `identifier`, so concurrently booting instances never create duplicates
//! and never overwrite an existing account.

use async_trait::async_trait;
use bson::{doc, Document};
use tracing::{info, warn};

use crate::auth::{generate_password, hash_password};
use crate::db::mongo::{classify, is_duplicate_key, MongoClient};
use crate::db::schemas::{UserDoc, ADMIN_ROLE, USER_COLLECTION};
use crate::lifecycle::{SeedRecord, SeedStore};
use crate::types::{Result, StockroomError};

/// Display name of the seeded account
pub const ADMIN_DISPLAY_NAME: &str = "Administrator";

/// Build the admin seed record. Without a configured password a random one
/// is hashed and thrown away; an operator resets it later.
pub fn admin_record(email: &str, password: Option<&str>) -> Result<SeedRecord> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(StockroomError::Config(format!(
            "admin e-mail '{email}' is not an address"
        )));
    }

    let password_hash = match password {
        Some(password) if !password.is_empty() => hash_password(password)?,
        _ => {
            warn!("No admin password configured, seeding the admin account with a random one");
            hash_password(&generate_password())?
        }
    };

    Ok(SeedRecord {
        identifier: email.to_lowercase(),
        display_name: ADMIN_DISPLAY_NAME.to_string(),
        role: ADMIN_ROLE.to_string(),
        password_hash,
    })
}

/// The full user document written when the account does not exist yet
fn seed_document(record: &SeedRecord) -> Result<Document> {
    let user = UserDoc::new(
        record.identifier.clone(),
        record.display_name.clone(),
        record.role.clone(),
        record.password_hash.clone(),
    );
    bson::to_document(&user)
        .map_err(|e| StockroomError::Seed(format!("failed to encode seed user: {e}")))
}

#[async_trait]
impl SeedStore for MongoClient {
    async fn insert_if_absent(&self, record: &SeedRecord) -> Result<bool> {
        // Binding the collection applies the unique index the upsert relies on
        let users = self.collection::<UserDoc>(USER_COLLECTION).await?;

        let filter = doc! { "identifier": record.identifier.as_str() };
        let update = doc! { "$setOnInsert": seed_document(record)? };

        match users.inner().update_one(filter, update).upsert(true).await {
            Ok(result) => Ok(result.upserted_id.is_some()),
            Err(e) if is_duplicate_key(&e) => {
                info!(identifier = %record.identifier, "Lost seeding race to another instance");
                Ok(false)
            }
            Err(e) => Err(classify("Seed upsert failed", e)),
        }
    }
}
