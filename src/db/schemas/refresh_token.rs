//! Refresh token document schema
//!
//! Tokens are stored hashed; expired ones are reaped by a TTL index.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const REFRESH_TOKEN_COLLECTION: &str = "refresh_tokens";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RefreshTokenDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub user_id: ObjectId,

    /// SHA-256 of the opaque token handed to the client
    pub token_hash: String,

    pub expires_at: Option<DateTime>,

    #[serde(default)]
    pub revoked: bool,
}

impl IntoIndexes for RefreshTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "token_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_hash_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1 },
                Some(IndexOptions::builder().name("user_id_index".to_string()).build()),
            ),
            (
                doc! { "expires_at": 1 },
                Some(
                    IndexOptions::builder()
                        .name("expires_at_ttl".to_string())
                        .expire_after(Duration::from_secs(0))
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RefreshTokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
