use crate::enums::{SourceKind, SourceStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry identifier of a price source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// The sentinel identity of the seller's own store.
    pub const OWN_STORE: &'static str = "self";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn own_store() -> Self {
        Self(Self::OWN_STORE.to_string())
    }

    pub fn is_own_store(&self) -> bool {
        self.0 == Self::OWN_STORE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A sellable item in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Case-insensitive match key used by ingestion.
    pub sku: String,
    pub current_price: Decimal,
    pub cost: Decimal,
    #[serde(default)]
    pub category: String,
}

impl Product {
    /// Returns true if `sku` names this product, ignoring ASCII case.
    pub fn matches_sku(&self, sku: &str) -> bool {
        self.sku.eq_ignore_ascii_case(sku.trim())
    }
}

/// A place prices are observed at: the own store or a competitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    pub kind: SourceKind,
    #[serde(default)]
    pub status: SourceStatus,
}

impl Source {
    /// Builds the single own-store source under the `"self"` sentinel id.
    pub fn own_store(name: impl Into<String>) -> Self {
        Self {
            id: SourceId::own_store(),
            name: name.into(),
            url: None,
            kind: SourceKind::OwnStore,
            status: SourceStatus::Active,
        }
    }

    pub fn competitor(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: SourceId::new(id),
            name: name.into(),
            url: None,
            kind: SourceKind::Competitor,
            status: SourceStatus::Active,
        }
    }

    pub fn is_own_store(&self) -> bool {
        self.kind == SourceKind::OwnStore
    }

    /// An active competitor is the only kind of source that feeds comparison aggregates.
    pub fn is_active_competitor(&self) -> bool {
        self.kind == SourceKind::Competitor && self.status.is_active()
    }
}

/// A single immutable price fact for a product at a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub product_id: ProductId,
    pub source_id: SourceId,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub available: bool,
    #[serde(default)]
    pub shipping_cost: Decimal,
}

impl Observation {
    pub fn new(
        product_id: ProductId,
        source_id: SourceId,
        timestamp: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        Self {
            product_id,
            source_id,
            timestamp,
            price,
            available: true,
            shipping_cost: Decimal::ZERO,
        }
    }

    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn with_shipping(mut self, shipping_cost: Decimal) -> Self {
        self.shipping_cost = shipping_cost;
        self
    }

    /// Price plus shipping, i.e. what a buyer actually pays.
    ///
    /// `None` if the sum does not fit in a `Decimal`.
    pub fn landed_price(&self) -> Option<Decimal> {
        self.price.checked_add(self.shipping_cost)
    }
}
