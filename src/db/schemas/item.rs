//! Inventory item document schema
//!
//! `recognized_labels` holds whatever the image-recognition service returned
//! for the item's photos; it is advisory and may be empty.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const ITEM_COLLECTION: &str = "items";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ItemDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub room_id: ObjectId,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Estimated value in minor currency units
    #[serde(default)]
    pub value_cents: Option<i64>,

    #[serde(default)]
    pub recognized_labels: Vec<String>,
}

fn default_quantity() -> u32 {
    1
}

impl IntoIndexes for ItemDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "room_id": 1 },
                Some(IndexOptions::builder().name("room_id_index".to_string()).build()),
            ),
            (
                doc! { "name": "text", "description": "text" },
                Some(IndexOptions::builder().name("item_text".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for ItemDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
