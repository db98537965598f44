//! # pricewatch Core Types
//!
//! The shared vocabulary of the workspace: catalog records, price observations
//! and the half-open time windows every query is bounded by.
//!
//! This is a Layer 0 crate. It has no knowledge of storage or analytics and
//! every other crate depends on it.

pub mod enums;
pub mod error;
pub mod structs;
pub mod window;

// Re-export the core types to provide a clean public API.
pub use enums::{SourceKind, SourceStatus};
pub use error::CoreError;
pub use structs::{Observation, Product, ProductId, Source, SourceId};
pub use window::TimeWindow;
