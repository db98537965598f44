use crate::error::AnalyticsError;
use crate::margin::MarginResult;
use crate::position::{Position, PositionResult};
use core_types::{ProductId, TimeWindow};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many products landed in each position bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PositionCounts {
    pub lowest: usize,
    pub competitive: usize,
    pub higher: usize,
    pub no_data: usize,
}

impl PositionCounts {
    pub fn record(&mut self, position: Position) {
        match position {
            Position::Lowest => self.lowest += 1,
            Position::Competitive => self.competitive += 1,
            Position::Higher => self.higher += 1,
            Position::NoData => self.no_data += 1,
        }
    }

    pub fn get(&self, position: Position) -> usize {
        match position {
            Position::Lowest => self.lowest,
            Position::Competitive => self.competitive,
            Position::Higher => self.higher,
            Position::NoData => self.no_data,
        }
    }

    /// Products that had competitor data to be classified against.
    pub fn classified(&self) -> usize {
        self.lowest + self.competitive + self.higher
    }

    pub fn total(&self) -> usize {
        self.classified() + self.no_data
    }
}

/// Upper bounds (exclusive) of the margin histogram bands, in percent.
const MARGIN_BAND_EDGES: [i64; 6] = [0, 10, 20, 30, 40, 50];

/// One band of the margin histogram: margins in `[lower, upper)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarginBand {
    /// `None` for the open-ended band below the first edge.
    pub lower: Option<Decimal>,
    /// `None` for the open-ended band above the last edge.
    pub upper: Option<Decimal>,
    pub count: usize,
}

impl MarginBand {
    pub fn contains(&self, margin: Decimal) -> bool {
        self.lower.is_none_or(|lo| margin >= lo) && self.upper.is_none_or(|hi| margin < hi)
    }

    pub fn label(&self) -> String {
        match (self.lower, self.upper) {
            (None, Some(hi)) => format!("< {hi}%"),
            (Some(lo), Some(hi)) => format!("{lo}-{hi}%"),
            (Some(lo), None) => format!(">= {lo}%"),
            (None, None) => "all".to_string(),
        }
    }
}

/// How the catalog's margins are spread, in fixed ten-point bands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarginDistribution {
    pub bands: Vec<MarginBand>,
    /// Products whose margin is N/A.
    pub undefined: usize,
}

impl Default for MarginDistribution {
    fn default() -> Self {
        let edges: Vec<Decimal> = MARGIN_BAND_EDGES.iter().map(|e| Decimal::from(*e)).collect();
        let mut bands = Vec::with_capacity(edges.len() + 1);
        let mut lower = None;
        for edge in edges {
            bands.push(MarginBand {
                lower,
                upper: Some(edge),
                count: 0,
            });
            lower = Some(edge);
        }
        bands.push(MarginBand {
            lower,
            upper: None,
            count: 0,
        });
        Self { bands, undefined: 0 }
    }
}

impl MarginDistribution {
    pub fn record(&mut self, margin: MarginResult) {
        match margin.value() {
            Some(pct) => {
                if let Some(band) = self.bands.iter_mut().find(|b| b.contains(pct)) {
                    band.count += 1;
                }
            }
            None => self.undefined += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.bands.iter().map(|b| b.count).sum::<usize>() + self.undefined
    }
}

/// Margin and position figures for one product category.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CategorySummary {
    pub products: usize,
    pub margin_count: usize,
    pub average_margin: Option<Decimal>,
    pub positions: PositionCounts,
    #[serde(skip)]
    margins: Vec<Decimal>,
}

impl CategorySummary {
    pub fn record(&mut self, row: &ProductReport) {
        self.products += 1;
        self.positions.record(row.position.position);
        if let Some(pct) = row.margin.value() {
            self.margins.push(pct);
        }
    }

    /// Computes the average over the recorded margins.
    pub fn finish(&mut self) -> Result<(), AnalyticsError> {
        self.margin_count = self.margins.len();
        if self.margins.is_empty() {
            self.average_margin = None;
            return Ok(());
        }
        let total = self
            .margins
            .iter()
            .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(*m))
            .ok_or(AnalyticsError::Overflow("category margin total"))?;
        self.average_margin = Some(total / Decimal::from(self.margins.len()));
        Ok(())
    }
}

/// One row of the product performance table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductReport {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub position: PositionResult,
    pub margin: MarginResult,
}

/// The catalog-wide roll-up produced by the `AggregateReporter`.
///
/// This is the data transfer object handed to whatever renders the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub window: TimeWindow,
    pub products_analyzed: usize,

    // I. Margins
    /// Number of products with a defined margin; the denominator of `average_margin`.
    pub margin_count: usize,
    pub average_margin: Option<Decimal>,
    pub min_margin: Option<Decimal>,
    pub max_margin: Option<Decimal>,

    // II. Competitive position
    pub positions: PositionCounts,
    pub average_percent_diff: Option<Decimal>,
    /// Share of classified products that are `Lowest` or `Competitive`.
    pub winning_share_pct: Option<Decimal>,

    // III. Distributions
    pub margin_distribution: MarginDistribution,
    /// Keyed by category label, in label order.
    pub categories: BTreeMap<String, CategorySummary>,

    // IV. Detail
    pub rows: Vec<ProductReport>,
}

impl Summary {
    /// Creates an empty summary for `window`.
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            products_analyzed: 0,
            margin_count: 0,
            average_margin: None,
            min_margin: None,
            max_margin: None,
            positions: PositionCounts::default(),
            average_percent_diff: None,
            winning_share_pct: None,
            margin_distribution: MarginDistribution::default(),
            categories: BTreeMap::new(),
            rows: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn counts_buckets() {
        let mut counts = PositionCounts::default();
        for p in [Position::Lowest, Position::Lowest, Position::Higher, Position::NoData] {
            counts.record(p);
        }
        assert_eq!(counts.get(Position::Lowest), 2);
        assert_eq!(counts.get(Position::Competitive), 0);
        assert_eq!(counts.classified(), 3);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn margins_fall_into_half_open_bands() {
        let mut dist = MarginDistribution::default();
        for m in [dec!(-5), dec!(0), dec!(9.99), dec!(10), dec!(49.9), dec!(50), dec!(75)] {
            dist.record(MarginResult::Defined(m));
        }
        dist.record(MarginResult::Undefined);

        let counts: Vec<usize> = dist.bands.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 1, 0, 0, 1, 2]);
        assert_eq!(dist.undefined, 1);
        assert_eq!(dist.total(), 8);
        assert_eq!(dist.bands[0].label(), "< 0%");
        assert_eq!(dist.bands[1].label(), "0-10%");
        assert_eq!(dist.bands[6].label(), ">= 50%");
    }
}
