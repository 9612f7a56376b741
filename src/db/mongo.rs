//! MongoDB client and collection wrapper
//!
//! `MongoClient` is the database handle the connection supervisor hands out.
//! Driver errors are classified here: connection-class failures become
//! `StockroomError::ConnectionLost` so the data proxy can replace the handle.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, Database, IndexModel,
};
use futures_util::{Stream, TryStreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::db::schemas::Metadata;
use crate::types::{Result, StockroomError};

/// Server error code for a unique index violation
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Bounds shared by every stored document type
pub trait Entity:
    Serialize + DeserializeOwned + Unpin + Send + Sync + Clone + Default + IntoIndexes + MutMetadata
{
}

impl<T> Entity for T where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Clone + Default + IntoIndexes + MutMetadata
{
}

/// Whether the driver lost its connection to the server (as opposed to the
/// server rejecting the operation).
pub fn is_connection_error(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. }
    )
}

/// Whether the server rejected a write because of a unique index
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Map a driver error into the service error, tagging lost connections
pub fn classify(context: &str, err: mongodb::error::Error) -> StockroomError {
    if is_connection_error(&err) {
        StockroomError::ConnectionLost(format!("{context}: {err}"))
    } else {
        StockroomError::Database(format!("{context}: {err}"))
    }
}

/// Append driver timeouts so an unreachable server fails an attempt quickly
/// instead of hanging it.
pub fn with_fast_timeouts(uri: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Open a client and verify the server answers a ping.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(with_fast_timeouts(uri))
            .await
            .map_err(|e| StockroomError::Connect(format!("invalid MongoDB target: {e}")))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StockroomError::Connect(format!("MongoDB ping failed: {e}")))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T: Entity>(&self, name: &str) -> Result<MongoCollection<T>> {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn database(&self) -> Database {
        self.client.database(&self.db_name)
    }

    /// Run a raw database command
    pub async fn run_command(&self, command: Document) -> Result<Document> {
        self.database()
            .run_command(command)
            .await
            .map_err(|e| classify("Command failed", e))
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Send + Sync,
{
    inner: Collection<T>,
}

impl<T: Entity> MongoCollection<T> {
    /// Bind a collection and apply its indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;
        debug!(collection = collection_name, "Collection bound");

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| classify("Failed to create indexes", e))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| classify("Insert failed", e))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StockroomError::Database("Failed to get inserted ID".into()))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(live(filter))
            .await
            .map_err(|e| classify("Find failed", e))
    }

    /// Find every live match. A cursor error partway through fails the whole
    /// call rather than returning a shortened list.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        let cursor = self
            .inner
            .find(live(filter))
            .await
            .map_err(|e| classify("Find failed", e))?;

        drain(cursor).await
    }

    /// Update one document, bumping `metadata.updated_at` for `$set` updates
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        let modifications = match update.into() {
            UpdateModifications::Document(mut update) => {
                let now = DateTime::now();
                match update.get_document_mut("$set") {
                    Ok(set) => {
                        set.insert("metadata.updated_at", now);
                    }
                    Err(_) => {
                        update.insert("$set", doc! { "metadata.updated_at": now });
                    }
                }
                UpdateModifications::Document(update)
            }
            other => other,
        };

        self.inner
            .update_one(live(filter), modifications)
            .await
            .map_err(|e| classify("Update failed", e))
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Count documents that are not soft-deleted
    pub async fn count(&self, filter: Document) -> Result<u64> {
        self.inner
            .count_documents(live(filter))
            .await
            .map_err(|e| classify("Count failed", e))
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Collect a cursor, failing on the first error it yields
async fn drain<T, S>(results: S) -> Result<Vec<T>>
where
    S: Stream<Item = mongodb::error::Result<T>>,
{
    results
        .try_collect()
        .await
        .map_err(|e| classify("Find failed", e))
}

/// Restrict a filter to documents that are not soft-deleted
fn live(mut filter: Document) -> Document {
    filter.insert("metadata.is_deleted", doc! { "$ne": true });
    filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fast_timeouts_appended() {
        assert_eq!(
            with_fast_timeouts("mongodb://localhost:27017"),
            "mongodb://localhost:27017?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000"
        );
        assert_eq!(
            with_fast_timeouts("mongodb://db/?replicaSet=rs0"),
            "mongodb://db/?replicaSet=rs0&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000"
        );
    }

    #[test]
    fn test_live_filter_excludes_deleted() {
        let filter = live(doc! { "room_id": "r1" });
        assert_eq!(filter.get_str("room_id").unwrap(), "r1");
        assert!(filter.get_document("metadata.is_deleted").is_ok());
    }

    #[test]
    fn test_io_errors_classified_as_connection_lost() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = mongodb::error::Error::from(ErrorKind::Io(Arc::new(io)));
        assert!(is_connection_error(&err));
        assert!(matches!(
            classify("Find failed", err),
            StockroomError::ConnectionLost(_)
        ));
    }

    #[tokio::test]
    async fn test_cursor_error_fails_the_whole_read() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let batches = futures_util::stream::iter(vec![
            Ok(1),
            Err(mongodb::error::Error::from(ErrorKind::Io(Arc::new(io)))),
            Ok(2),
        ]);

        let err = drain(batches).await.unwrap_err();
        assert!(matches!(err, StockroomError::ConnectionLost(_)));

        let complete = drain(futures_util::stream::iter(vec![Ok(1), Ok(2)])).await.unwrap();
        assert_eq!(complete, vec![1, 2]);
    }

    #[test]
    fn test_other_errors_classified_as_database() {
        let err = mongodb::error::Error::custom("bad filter");
        assert!(!is_connection_error(&err));
        assert!(!is_duplicate_key(&err));
        assert!(matches!(
            classify("Find failed", err),
            StockroomError::Database(_)
        ));
    }
}
