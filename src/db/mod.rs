//! MongoDB storage behind the connection lifecycle

pub mod mongo;
pub mod opener;
pub mod repository;
pub mod schemas;
pub mod seed;

pub use mongo::{Entity, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use opener::MongoOpener;
pub use repository::{EntityCounts, Repositories, Repository};
pub use seed::admin_record;
