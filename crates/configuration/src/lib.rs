use crate::error::ConfigError;
use config::{Environment, File, FileFormat};
use rust_decimal::Decimal;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AlertThresholds, AnalysisSettings, CatalogConfig, CompetitorEntry, Config, MapPrice,
    PricingRule, RuleKind,
};

/// The longest analysis window, in days, a configuration may ask for.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// The prefix for environment overrides, e.g. `PRICEWATCH__ANALYSIS__WINDOW_DAYS=7`.
const ENV_PREFIX: &str = "PRICEWATCH";

/// Loads the application configuration from a TOML file.
///
/// Values from the file can be overridden by `PRICEWATCH__`-prefixed environment
/// variables. The result is validated before being returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::info!(
        path = %path.display(),
        products = config.catalog.products.len(),
        competitors = config.catalog.competitors.len(),
        rules = config.pricing_rules.len(),
        "Configuration loaded."
    );
    Ok(config)
}

/// Parses and validates a configuration held in memory as TOML.
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

/// Checks the cross-field rules that serde cannot express.
///
/// Structural catalog checks (unique ids and SKUs, positive prices) belong to the
/// store, which enforces them for every catalog regardless of where it came from.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let hundred = Decimal::ONE_HUNDRED;

    if config.catalog.products.is_empty() {
        return Err(ConfigError::EmptyCatalog);
    }
    if config.analysis.window_days <= 0 || config.analysis.window_days > MAX_WINDOW_DAYS {
        return Err(ConfigError::ValidationError(format!(
            "analysis.window_days must be between 1 and {MAX_WINDOW_DAYS}, got {}",
            config.analysis.window_days
        )));
    }

    let alerts = &config.alerts;
    for (name, value) in [
        ("price_drop_pct", alerts.price_drop_pct),
        ("critical_drop_pct", alerts.critical_drop_pct),
        ("min_margin_pct", alerts.min_margin_pct),
    ] {
        if value < Decimal::ZERO || value > hundred {
            return Err(ConfigError::ValidationError(format!(
                "alerts.{name} must be between 0 and 100, got {value}"
            )));
        }
    }
    if alerts.critical_drop_pct < alerts.price_drop_pct {
        return Err(ConfigError::ValidationError(
            "alerts.critical_drop_pct must not be below alerts.price_drop_pct".to_string(),
        ));
    }

    for map in &config.map_prices {
        if map.price <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "MAP price for {} must be greater than 0",
                map.sku
            )));
        }
    }

    for rule in &config.pricing_rules {
        if rule.floor_price <= Decimal::ZERO || rule.floor_price > rule.ceiling_price {
            return Err(ConfigError::ValidationError(format!(
                "rule {}: floor_price must be positive and not above ceiling_price",
                rule.id
            )));
        }
        if let Some(min) = rule.min_margin_pct {
            if min < Decimal::ZERO || min >= hundred {
                return Err(ConfigError::ValidationError(format!(
                    "rule {}: min_margin_pct must be in [0, 100)",
                    rule.id
                )));
            }
        }
        match rule.kind {
            RuleKind::MatchLowest => {}
            RuleKind::BeatBy { percent } => {
                if percent <= Decimal::ZERO || percent >= hundred {
                    return Err(ConfigError::ValidationError(format!(
                        "rule {}: beat-by percent must be in (0, 100)",
                        rule.id
                    )));
                }
            }
            RuleKind::FixedMargin { target_margin_pct } => {
                if target_margin_pct < Decimal::ZERO || target_margin_pct >= hundred {
                    return Err(ConfigError::ValidationError(format!(
                        "rule {}: target_margin_pct must be in [0, 100)",
                        rule.id
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::SourceStatus;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"
        [catalog]
        store_name = "Acme Audio"

        [[catalog.products]]
        id = 1
        name = "Wireless Headphones Pro"
        sku = "WHP-001"
        current_price = "299.99"
        cost = "150.00"
        category = "Electronics"

        [[catalog.competitors]]
        id = "amazon"
        name = "Amazon"
        url = "amazon.com"

        [[catalog.competitors]]
        id = "newegg"
        name = "Newegg"
        status = "Inactive"

        [[map_prices]]
        sku = "WHP-001"
        price = "279.99"

        [[pricing_rules]]
        id = 1
        sku = "WHP-001"
        kind = { type = "BeatBy", percent = "5" }
        floor_price = "249.99"
        ceiling_price = "349.99"
        min_margin_pct = "30"
    "#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.catalog.products.len(), 1);
        assert_eq!(config.catalog.products[0].current_price, dec!(299.99));
        assert_eq!(config.analysis, AnalysisSettings::default());
        assert_eq!(config.alerts.critical_drop_pct, dec!(15));
        assert_eq!(config.map_prices[0].price, dec!(279.99));

        let rule = &config.pricing_rules[0];
        assert!(rule.active);
        assert_eq!(rule.kind, RuleKind::BeatBy { percent: dec!(5) });
    }

    #[test]
    fn registry_puts_own_store_first() {
        let config = parse_config(SAMPLE).unwrap();
        let sources = config.catalog.sources();
        assert_eq!(sources.len(), 3);
        assert!(sources[0].id.is_own_store());
        assert_eq!(sources[0].name, "Acme Audio");
        assert_eq!(sources[2].status, SourceStatus::Inactive);
    }

    #[test]
    fn rejects_empty_catalog() {
        let empty = "[catalog]\nproducts = []\n";
        assert!(matches!(parse_config(empty), Err(ConfigError::EmptyCatalog)));
    }

    #[test]
    fn rejects_inverted_price_band() {
        let bad = SAMPLE.replace("ceiling_price = \"349.99\"", "ceiling_price = \"200.00\"");
        assert!(matches!(parse_config(&bad), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_critical_threshold_below_warning() {
        let bad = format!("{SAMPLE}\n[alerts]\nprice_drop_pct = \"20\"\ncritical_drop_pct = \"10\"\n");
        assert!(matches!(parse_config(&bad), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_window_days_out_of_range() {
        for days in [0, MAX_WINDOW_DAYS + 1, 100_000_000] {
            let bad = format!("{SAMPLE}\n[analysis]\nwindow_days = {days}\n");
            assert!(
                matches!(parse_config(&bad), Err(ConfigError::ValidationError(_))),
                "window_days = {days}"
            );
        }
        let ok = format!("{SAMPLE}\n[analysis]\nwindow_days = {MAX_WINDOW_DAYS}\n");
        assert_eq!(parse_config(&ok).unwrap().analysis.window_days, MAX_WINDOW_DAYS);
    }
}
