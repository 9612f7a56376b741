//! Property document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const PROPERTY_COLLECTION: &str = "properties";

/// A property (house, flat, storage unit) owned by a user
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PropertyDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub owner_id: ObjectId,

    pub name: String,

    #[serde(default)]
    pub address: Option<String>,
}

impl IntoIndexes for PropertyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "owner_id": 1 },
            Some(IndexOptions::builder().name("owner_id_index".to_string()).build()),
        )]
    }
}

impl MutMetadata for PropertyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
