//! Per-entity repositories behind the data-access proxy
//!
//! Every call waits (bounded) for the database, then runs against the
//! collection bound to the live connection. A connection-class failure
//! reports the handle as lost so the supervisor replaces it.

use bson::{oid::ObjectId, Document};
use mongodb::results::UpdateResult;
use serde::Serialize;

use crate::db::mongo::{Entity, MongoClient, MongoCollection};
use crate::db::schemas::{
    ImageDoc, ItemDoc, PropertyDoc, RefreshTokenDoc, RoomDoc, UserDoc, IMAGE_COLLECTION,
    ITEM_COLLECTION, PROPERTY_COLLECTION, REFRESH_TOKEN_COLLECTION, ROOM_COLLECTION,
    USER_COLLECTION,
};
use crate::lifecycle::{DataProxy, GenerationalBinding};
use crate::types::Result;

pub struct Repository<T: Entity> {
    name: &'static str,
    binding: GenerationalBinding<MongoClient, MongoCollection<T>>,
}

impl<T: Entity> Repository<T> {
    pub fn new(proxy: DataProxy<MongoClient>, name: &'static str) -> Self {
        Self {
            name,
            binding: GenerationalBinding::new(proxy),
        }
    }

    /// Collection name
    pub fn name(&self) -> &'static str {
        self.name
    }

    async fn collection(&self) -> Result<(u64, MongoCollection<T>)> {
        let name = self.name;
        self.binding
            .get_or_bind(|client| async move { client.collection::<T>(name).await })
            .await
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<T>> {
        let (generation, collection) = self.collection().await?;
        let result = collection.find_many(filter).await;
        self.binding.proxy().observe(generation, result)
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let (generation, collection) = self.collection().await?;
        let result = collection.find_one(filter).await;
        self.binding.proxy().observe(generation, result)
    }

    /// Insert a new document
    pub async fn save(&self, item: T) -> Result<ObjectId> {
        let (generation, collection) = self.collection().await?;
        let result = collection.insert_one(item).await;
        self.binding.proxy().observe(generation, result)
    }

    pub async fn update(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        let (generation, collection) = self.collection().await?;
        let result = collection.update_one(filter, update).await;
        self.binding.proxy().observe(generation, result)
    }

    /// Soft delete; the document stays in the collection but is no longer
    /// returned by any query.
    pub async fn delete(&self, filter: Document) -> Result<UpdateResult> {
        let (generation, collection) = self.collection().await?;
        let result = collection.soft_delete(filter).await;
        self.binding.proxy().observe(generation, result)
    }

    pub async fn count(&self, filter: Document) -> Result<u64> {
        let (generation, collection) = self.collection().await?;
        let result = collection.count(filter).await;
        self.binding.proxy().observe(generation, result)
    }

    /// Run a raw database command
    pub async fn raw_query(&self, command: Document) -> Result<Document> {
        self.binding
            .proxy()
            .with_handle(|client| async move { client.run_command(command).await })
            .await
    }
}

/// Document counts per collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub users: u64,
    pub properties: u64,
    pub rooms: u64,
    pub items: u64,
    pub images: u64,
}

/// All repositories the service uses, sharing one proxy
pub struct Repositories {
    pub users: Repository<UserDoc>,
    pub refresh_tokens: Repository<RefreshTokenDoc>,
    pub properties: Repository<PropertyDoc>,
    pub rooms: Repository<RoomDoc>,
    pub items: Repository<ItemDoc>,
    pub images: Repository<ImageDoc>,
}

impl Repositories {
    pub fn new(proxy: DataProxy<MongoClient>) -> Self {
        Self {
            users: Repository::new(proxy.clone(), USER_COLLECTION),
            refresh_tokens: Repository::new(proxy.clone(), REFRESH_TOKEN_COLLECTION),
            properties: Repository::new(proxy.clone(), PROPERTY_COLLECTION),
            rooms: Repository::new(proxy.clone(), ROOM_COLLECTION),
            items: Repository::new(proxy.clone(), ITEM_COLLECTION),
            images: Repository::new(proxy, IMAGE_COLLECTION),
        }
    }

    pub async fn counts(&self) -> Result<EntityCounts> {
        let empty = Document::new;
        Ok(EntityCounts {
            users: self.users.count(empty()).await?,
            properties: self.properties.count(empty()).await?,
            rooms: self.rooms.count(empty()).await?,
            items: self.items.count(empty()).await?,
            images: self.images.count(empty()).await?,
        })
    }
}
