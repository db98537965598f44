use core_types::{Product, Source, SourceKind, SourceStatus, SourceId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)] // Use default values if the [analysis] section is missing
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub alerts: AlertThresholds,
    /// Minimum Advertised Prices, keyed by SKU.
    #[serde(default)]
    pub map_prices: Vec<MapPrice>,
    #[serde(default)]
    pub pricing_rules: Vec<PricingRule>,
}

/// The product catalog and the source registry.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Display name of the own store. Its registry id is always `"self"`.
    #[serde(default = "default_store_name")]
    pub store_name: String,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub competitors: Vec<CompetitorEntry>,
}

fn default_store_name() -> String {
    "Your Store".to_string()
}

impl CatalogConfig {
    /// Builds the full source registry: the own store followed by every competitor.
    pub fn sources(&self) -> Vec<Source> {
        std::iter::once(Source::own_store(self.store_name.clone()))
            .chain(self.competitors.iter().map(CompetitorEntry::to_source))
            .collect()
    }
}

/// A tracked competitor storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CompetitorEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: SourceStatus,
}

impl CompetitorEntry {
    pub fn to_source(&self) -> Source {
        Source {
            id: SourceId::new(self.id.clone()),
            name: self.name.clone(),
            url: self.url.clone(),
            kind: SourceKind::Competitor,
            status: self.status,
        }
    }
}

/// Knobs for the position analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Compare landed prices (price + shipping) instead of list prices.
    pub include_shipping: bool,
    /// Count competitor offers that are out of stock.
    pub include_unavailable: bool,
    /// Length of the default observation window, in days.
    pub window_days: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            include_shipping: false,
            include_unavailable: true,
            window_days: 30,
        }
    }
}

/// Thresholds used by the alert scanner. Percentages are on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// A competitor price drop at or above this percentage raises a warning.
    pub price_drop_pct: Decimal,
    /// A competitor price drop at or above this percentage is critical.
    pub critical_drop_pct: Decimal,
    /// Products whose margin falls below this percentage are flagged.
    pub min_margin_pct: Decimal,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            price_drop_pct: dec!(10),
            critical_drop_pct: dec!(15),
            min_margin_pct: dec!(20),
        }
    }
}

/// The Minimum Advertised Price agreed for a SKU.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapPrice {
    pub sku: String,
    pub price: Decimal,
}

/// An advisory repricing rule for a single SKU.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricingRule {
    pub id: u32,
    pub sku: String,
    pub kind: RuleKind,
    pub floor_price: Decimal,
    pub ceiling_price: Decimal,
    #[serde(default)]
    pub min_margin_pct: Option<Decimal>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// How a pricing rule derives its target price.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum RuleKind {
    /// Match the cheapest active competitor.
    MatchLowest,
    /// Undercut the cheapest active competitor by a percentage.
    BeatBy { percent: Decimal },
    /// Price at a fixed gross margin over cost.
    FixedMargin { target_margin_pct: Decimal },
}
