//! Item photo document schema
//!
//! The bytes live in object storage; only the key is kept here.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const IMAGE_COLLECTION: &str = "images";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ImageDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub item_id: ObjectId,

    /// Object storage key
    pub storage_key: String,

    pub content_type: String,

    #[serde(default)]
    pub size_bytes: u64,
}

impl IntoIndexes for ImageDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "item_id": 1 },
                Some(IndexOptions::builder().name("item_id_index".to_string()).build()),
            ),
            (
                doc! { "storage_key": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("storage_key_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ImageDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
