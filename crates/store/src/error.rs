use core_types::{ProductId, SourceId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Why a catalog or an observation was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Observation references unknown product {0}")]
    UnknownProduct(ProductId),

    #[error("Observation references unknown source '{0}'")]
    UnknownSource(SourceId),

    #[error("Price must not be negative, got {0}")]
    NegativePrice(Decimal),

    #[error("Shipping cost must not be negative, got {0}")]
    NegativeShipping(Decimal),

    #[error("Duplicate product id {0}")]
    DuplicateProductId(ProductId),

    #[error("Duplicate SKU '{0}' (SKUs are matched case-insensitively)")]
    DuplicateSku(String),

    #[error("Duplicate source id '{0}'")]
    DuplicateSource(SourceId),

    #[error("Product {0} has an invalid price or cost: {1}")]
    InvalidProduct(ProductId, String),

    #[error("Source registry must contain exactly one own store with id 'self', found {0}")]
    OwnStore(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Product {0} not found in the catalog")]
    UnknownProduct(ProductId),

    #[error("Source '{0}' not found in the registry")]
    UnknownSource(SourceId),

    #[error("The store lock was poisoned by a panicking writer")]
    LockPoisoned,
}
