//! Room document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const ROOM_COLLECTION: &str = "rooms";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RoomDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub property_id: ObjectId,

    pub name: String,
}

impl IntoIndexes for RoomDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "property_id": 1 },
            Some(IndexOptions::builder().name("property_id_index".to_string()).build()),
        )]
    }
}

impl MutMetadata for RoomDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
