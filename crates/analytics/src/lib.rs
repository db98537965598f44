//! # pricewatch Analytics Engine
//!
//! This crate turns a window of price observations into competitive-position and
//! margin figures, and rolls those up into a catalog-wide summary.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** a pure logic crate. It reads from the `store` crate and
//!   knows nothing about how observations were gathered or how results are shown.
//! - **Deterministic:** identical store contents and windows always produce
//!   identical results. There is no randomness anywhere in this crate.
//! - **Absence is explicit:** missing data is `None`, `Position::NoData` or
//!   `MarginResult::Undefined`, never a zero.
//!
//! ## Public API
//!
//! - `PositionAnalyzer` / `PositionResult` / `Position`: per-product price position.
//! - `margin` / `MarginResult`: gross margin calculation.
//! - `AggregateReporter` / `Summary`: the catalog-wide roll-up.
//! - `daily_series`: per-day average prices for trend charts.
//! - `RepricingAdvisor`: advisory price suggestions from pricing rules.

pub mod engine;
pub mod error;
pub mod history;
pub mod margin;
pub mod position;
pub mod pricing;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AggregateReporter;
pub use error::AnalyticsError;
pub use history::{DailyPrice, daily_series};
pub use margin::{MarginResult, margin, price_for_margin};
pub use position::{Position, PositionAnalyzer, PositionResult, PriceBasis};
pub use pricing::{PriceBound, PriceSuggestion, RepricingAdvisor};
pub use report::{
    CategorySummary, MarginBand, MarginDistribution, PositionCounts, ProductReport, Summary,
};
