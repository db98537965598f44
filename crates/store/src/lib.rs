//! # pricewatch Observation Store
//!
//! Holds the product catalog, the source registry and the append-only series of
//! price observations, and answers time-windowed queries over them.
//!
//! ## Architectural Principles
//!
//! - **Append-only:** observations are never mutated or removed. A correction is
//!   simply a newer observation.
//! - **Atomic writes:** every record (or batch) is validated and inserted under a
//!   single write-lock acquisition, with validation finishing before the first
//!   insert. Readers never see a partial record, and a rejected record leaves the
//!   store untouched.
//! - **Window-bounded reads:** each product's series is kept in timestamp order, so a
//!   query copies only the slice inside its window.
//!
//! ## Public API
//!
//! - `Catalog`: the validated product catalog plus source registry.
//! - `ObservationStore`: the thread-safe store.
//! - `ObservationQuery` / `SourceFilter`: the result of a windowed query.

pub mod catalog;
pub mod error;
pub mod query;
pub mod store;

pub use catalog::Catalog;
pub use error::{StoreError, ValidationError};
pub use query::{LatestPair, ObservationQuery, SourceFilter};
pub use store::ObservationStore;
