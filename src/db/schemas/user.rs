//! User document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// Role granted to the seeded administrative account
pub const ADMIN_ROLE: &str = "admin";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Login e-mail, unique across users
    pub identifier: String,

    pub display_name: String,

    /// `admin` or `user`
    #[serde(default = "default_role")]
    pub role: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Token version for invalidation (increment to invalidate all tokens)
    #[serde(default)]
    pub token_version: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    pub fn new(identifier: String, display_name: String, role: String, password_hash: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            identifier,
            display_name,
            role,
            password_hash,
            token_version: 1,
            is_active: true,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "identifier": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("identifier_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
