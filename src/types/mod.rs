//! Shared types for Stockroom

mod error;

pub use error::{Result, StockroomError};
