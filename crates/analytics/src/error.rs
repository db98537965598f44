use core_types::ProductId;
use rust_decimal::Decimal;
use store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Margin is undefined for a price of {0}")]
    UndefinedMargin(Decimal),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pricing rule {0} is invalid: {1}")]
    InvalidRule(u32, String),

    #[error("Pricing rule {0} is not active")]
    RuleInactive(u32),

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("Product {0} not found in the catalog")]
    UnknownProduct(ProductId),

    #[error("Observation store error: {0}")]
    Store(#[from] StoreError),
}
