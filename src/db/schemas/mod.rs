//! Database schemas for Stockroom
//!
//! Document structures for users, refresh tokens, and the inventory
//! hierarchy (property > room > item > image).

mod image;
mod item;
mod metadata;
mod property;
mod refresh_token;
mod room;
mod user;

pub use image::{ImageDoc, IMAGE_COLLECTION};
pub use item::{ItemDoc, ITEM_COLLECTION};
pub use metadata::Metadata;
pub use property::{PropertyDoc, PROPERTY_COLLECTION};
pub use refresh_token::{RefreshTokenDoc, REFRESH_TOKEN_COLLECTION};
pub use room::{RoomDoc, ROOM_COLLECTION};
pub use user::{UserDoc, ADMIN_ROLE, USER_COLLECTION};
