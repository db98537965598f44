use analytics::MarginResult;
use chrono::{DateTime, Utc};
use configuration::{AlertThresholds, MapPrice};
use core_types::{Observation, Product, ProductId, SourceId, TimeWindow};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use store::{LatestPair, ObservationStore, SourceFilter};
pub mod error;

pub use error::AlerterError;

/// How urgently an alert needs attention. Orders `Critical` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "Critical"),
            Severity::Warning => write!(f, "Warning"),
            Severity::Info => write!(f, "Info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertKind {
    MapViolation,
    PriceDrop,
    StockOut,
    LowMargin,
    UndefinedMargin,
}

/// A condition worth a human's attention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub product_id: ProductId,
    pub sku: String,
    pub source: Option<SourceId>,
    pub message: String,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Scans the latest active-competitor observations for alert conditions.
pub struct AlertScanner<'a> {
    store: &'a ObservationStore,
    thresholds: AlertThresholds,
    /// MAP by lower-cased SKU.
    map_prices: HashMap<String, Decimal>,
}

impl<'a> AlertScanner<'a> {
    pub fn new(store: &'a ObservationStore, thresholds: AlertThresholds, map_prices: &[MapPrice]) -> Self {
        let map_prices = map_prices
            .iter()
            .map(|m| (m.sku.trim().to_ascii_lowercase(), m.price))
            .collect();
        Self {
            store,
            thresholds,
            map_prices,
        }
    }

    /// Returns every alert raised for `products` over `window`.
    ///
    /// Alerts are ordered by severity (critical first), then SKU, then source.
    pub fn scan(&self, products: &[Product], window: TimeWindow) -> Result<Vec<Alert>, AlerterError> {
        let names: HashMap<SourceId, String> = self
            .store
            .sources()?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let mut alerts = Vec::new();
        for product in products {
            let pairs = self.store.latest_pairs(product.id, window, SourceFilter::ActiveCompetitors)?;
            for pair in &pairs {
                let name = names
                    .get(&pair.latest.source_id)
                    .map(String::as_str)
                    .unwrap_or(pair.latest.source_id.as_str());
                alerts.extend(self.check_map(product, &pair.latest, name));
                alerts.extend(self.check_price_drop(product, pair, name));
                alerts.extend(self.check_stock_out(product, &pair.latest, name));
            }
            alerts.extend(self.check_margin(product));
        }

        alerts.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.sku.cmp(&b.sku))
                .then_with(|| a.source.cmp(&b.source))
        });

        for alert in &alerts {
            match alert.severity {
                Severity::Critical | Severity::Warning => {
                    tracing::warn!(sku = %alert.sku, kind = ?alert.kind, "{}", alert.message)
                }
                Severity::Info => tracing::info!(sku = %alert.sku, kind = ?alert.kind, "{}", alert.message),
            }
        }
        Ok(alerts)
    }

    fn check_map(&self, product: &Product, latest: &Observation, name: &str) -> Option<Alert> {
        let map = *self.map_prices.get(&product.sku.trim().to_ascii_lowercase())?;
        if latest.price >= map {
            return None;
        }
        Some(Alert {
            kind: AlertKind::MapViolation,
            severity: Severity::Warning,
            product_id: product.id,
            sku: product.sku.clone(),
            source: Some(latest.source_id.clone()),
            message: format!(
                "MAP violation detected on {}: {} advertises {} (MAP {})",
                product.name, name, latest.price, map
            ),
            observed_at: Some(latest.timestamp),
        })
    }

    fn check_price_drop(&self, product: &Product, pair: &LatestPair, name: &str) -> Option<Alert> {
        let previous = pair.previous.as_ref()?;
        if previous.price <= Decimal::ZERO || pair.latest.price >= previous.price {
            return None;
        }
        let drop_pct = (previous.price - pair.latest.price) / previous.price * Decimal::ONE_HUNDRED;
        let severity = if drop_pct >= self.thresholds.critical_drop_pct {
            Severity::Critical
        } else if drop_pct >= self.thresholds.price_drop_pct {
            Severity::Warning
        } else {
            return None;
        };
        Some(Alert {
            kind: AlertKind::PriceDrop,
            severity,
            product_id: product.id,
            sku: product.sku.clone(),
            source: Some(pair.latest.source_id.clone()),
            message: format!(
                "{} dropped price by {}% on {} ({} -> {})",
                name,
                drop_pct.round_dp(1),
                product.name,
                previous.price,
                pair.latest.price
            ),
            observed_at: Some(pair.latest.timestamp),
        })
    }

    fn check_stock_out(&self, product: &Product, latest: &Observation, name: &str) -> Option<Alert> {
        if latest.available {
            return None;
        }
        Some(Alert {
            kind: AlertKind::StockOut,
            severity: Severity::Critical,
            product_id: product.id,
            sku: product.sku.clone(),
            source: Some(latest.source_id.clone()),
            message: format!("Stock-out detected at {} for {}", name, product.name),
            observed_at: Some(latest.timestamp),
        })
    }

    fn check_margin(&self, product: &Product) -> Option<Alert> {
        let (kind, severity, message) = match MarginResult::for_product(product) {
            MarginResult::Defined(pct) if pct < self.thresholds.min_margin_pct => (
                AlertKind::LowMargin,
                Severity::Warning,
                format!(
                    "Margin on {} is {} (minimum {}%)",
                    product.name,
                    MarginResult::Defined(pct),
                    self.thresholds.min_margin_pct
                ),
            ),
            MarginResult::Defined(_) => return None,
            MarginResult::Undefined => (
                AlertKind::UndefinedMargin,
                Severity::Info,
                format!("Margin on {} is N/A (price {})", product.name, product.current_price),
            ),
        };
        Some(Alert {
            kind,
            severity,
            product_id: product.id,
            sku: product.sku.clone(),
            source: None,
            message,
            observed_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::{Source, SourceStatus};
    use rust_decimal_macros::dec;

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, 10, 0, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(t(1), t(28)).unwrap()
    }

    fn products() -> Vec<Product> {
        vec![
            Product {
                id: ProductId(1),
                name: "Wireless Headphones Pro".to_string(),
                sku: "WHP-001".to_string(),
                current_price: dec!(299.99),
                cost: dec!(150),
                category: "Electronics".to_string(),
            },
            Product {
                id: ProductId(2),
                name: "USB-C Hub Elite".to_string(),
                sku: "UCH-400".to_string(),
                current_price: dec!(79.99),
                cost: dec!(70),
                category: "Accessories".to_string(),
            },
        ]
    }

    fn store() -> ObservationStore {
        let mut target = Source::competitor("target", "Target");
        target.status = SourceStatus::Inactive;
        ObservationStore::from_parts(
            products(),
            vec![
                Source::own_store("Your Store"),
                Source::competitor("amazon", "Amazon"),
                Source::competitor("walmart", "Walmart"),
                target,
            ],
        )
        .unwrap()
    }

    fn record(store: &ObservationStore, id: u64, source: &str, day: u32, price: Decimal, available: bool) {
        let obs = Observation::new(ProductId(id), SourceId::new(source), t(day), price)
            .with_availability(available);
        store.record(obs).unwrap();
    }

    fn scanner(store: &ObservationStore) -> AlertScanner<'_> {
        let map = vec![MapPrice {
            sku: "whp-001".to_string(),
            price: dec!(279.99),
        }];
        AlertScanner::new(store, AlertThresholds::default(), &map)
    }

    #[test]
    fn flags_map_violation_on_latest_price_only() {
        let store = store();
        record(&store, 1, "amazon", 1, dec!(259.99), true);
        record(&store, 1, "amazon", 2, dec!(289.99), true);
        record(&store, 1, "walmart", 2, dec!(269.99), true);

        let alerts = scanner(&store).scan(&products()[..1], window()).unwrap();
        let map: Vec<_> = alerts.iter().filter(|a| a.kind == AlertKind::MapViolation).collect();
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].source, Some(SourceId::new("walmart")));
        assert!(map[0].message.contains("Walmart"));
    }

    #[test]
    fn grades_price_drops_by_threshold() {
        let store = store();
        // 300 -> 255 is a 15% drop: critical.
        record(&store, 1, "amazon", 1, dec!(300), true);
        record(&store, 1, "amazon", 3, dec!(255), true);
        // 300 -> 288 is a 4% drop: ignored. 300 -> 264 (12%) would be a warning.
        record(&store, 1, "walmart", 1, dec!(300), true);
        record(&store, 1, "walmart", 3, dec!(288), true);

        let alerts = scanner(&store).scan(&products()[..1], window()).unwrap();
        let drops: Vec<_> = alerts.iter().filter(|a| a.kind == AlertKind::PriceDrop).collect();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].severity, Severity::Critical);
        assert_eq!(drops[0].source, Some(SourceId::new("amazon")));

        record(&store, 1, "walmart", 4, dec!(253), true);
        let alerts = scanner(&store).scan(&products()[..1], window()).unwrap();
        let walmart = alerts
            .iter()
            .find(|a| a.kind == AlertKind::PriceDrop && a.source == Some(SourceId::new("walmart")))
            .unwrap();
        assert_eq!(walmart.severity, Severity::Warning);
    }

    #[test]
    fn reports_stock_outs_and_low_margins_sorted_by_severity() {
        let store = store();
        record(&store, 2, "amazon", 2, dec!(84.99), false);
        // Inactive competitors never raise alerts.
        record(&store, 2, "target", 2, dec!(10), false);

        let alerts = scanner(&store).scan(&products(), window()).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::StockOut);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[1].kind, AlertKind::LowMargin);
        assert_eq!(alerts[1].sku, "UCH-400");
    }

    #[test]
    fn undefined_margin_is_informational() {
        let store = store();
        let mut free = products().remove(0);
        free.current_price = Decimal::ZERO;
        let alerts = scanner(&store).scan(&[free], window()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::UndefinedMargin);
        assert_eq!(alerts[0].severity, Severity::Info);
        assert!(alerts[0].message.contains("N/A"));
    }
}
