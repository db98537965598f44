use crate::error::AnalyticsError;
use crate::margin::MarginResult;
use crate::position::{Position, PositionAnalyzer};
use crate::report::{ProductReport, Summary};
use core_types::{Product, TimeWindow};
use rust_decimal::Decimal;

/// Rolls per-product position and margin results into a `Summary`.
#[derive(Debug, Clone)]
pub struct AggregateReporter<'a> {
    analyzer: PositionAnalyzer<'a>,
}

impl<'a> AggregateReporter<'a> {
    pub fn new(analyzer: PositionAnalyzer<'a>) -> Self {
        Self { analyzer }
    }

    /// The main entry point for the catalog-wide report.
    ///
    /// # Arguments
    ///
    /// * `products` - The products to report on, in display order.
    /// * `window` - The observation window every product is analyzed over.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Summary` or an `AnalyticsError`.
    pub fn summarize(
        &self,
        products: &[Product],
        window: TimeWindow,
    ) -> Result<Summary, AnalyticsError> {
        let mut summary = Summary::new(window);

        for product in products {
            let position = self.analyzer.analyze(product, window)?;
            summary.rows.push(ProductReport {
                product_id: product.id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                category: product.category.clone(),
                position,
                margin: MarginResult::for_product(product),
            });
        }
        summary.products_analyzed = summary.rows.len();

        self.calculate_margins(&mut summary)?;
        self.calculate_positions(&mut summary)?;
        self.calculate_distributions(&mut summary)?;

        tracing::info!(
            products = summary.products_analyzed,
            lowest = summary.positions.lowest,
            competitive = summary.positions.competitive,
            higher = summary.positions.higher,
            no_data = summary.positions.no_data,
            "Summary calculated."
        );
        Ok(summary)
    }

    /// Margin statistics over the products whose margin is defined.
    ///
    /// Undefined margins are left out of the denominator rather than counted as zero.
    fn calculate_margins(&self, summary: &mut Summary) -> Result<(), AnalyticsError> {
        let margins: Vec<Decimal> = summary.rows.iter().filter_map(|r| r.margin.value()).collect();
        summary.margin_count = margins.len();

        if margins.is_empty() {
            return Ok(());
        }

        let total = checked_sum(&margins, "margin total")?;
        summary.average_margin = Some(total / Decimal::from(margins.len()));
        summary.min_margin = margins.iter().copied().min();
        summary.max_margin = margins.iter().copied().max();
        Ok(())
    }

    /// Position buckets, average price difference and winning share.
    fn calculate_positions(&self, summary: &mut Summary) -> Result<(), AnalyticsError> {
        let mut diffs = Vec::new();
        for row in &summary.rows {
            summary.positions.record(row.position.position);
            if let Some(diff) = row.position.percent_diff {
                diffs.push(diff);
            }
        }

        if !diffs.is_empty() {
            let total = checked_sum(&diffs, "percent difference total")?;
            summary.average_percent_diff = Some(total / Decimal::from(diffs.len()));
        }

        let classified = summary.positions.classified();
        if classified > 0 {
            let winning = summary.positions.get(Position::Lowest)
                + summary.positions.get(Position::Competitive);
            summary.winning_share_pct = Some(
                Decimal::from(winning) / Decimal::from(classified) * Decimal::ONE_HUNDRED,
            );
        }
        Ok(())
    }

    /// Margin histogram and per-category roll-up.
    fn calculate_distributions(&self, summary: &mut Summary) -> Result<(), AnalyticsError> {
        for row in &summary.rows {
            summary.margin_distribution.record(row.margin);
            summary
                .categories
                .entry(row.category.clone())
                .or_default()
                .record(row);
        }
        for category in summary.categories.values_mut() {
            category.finish()?;
        }
        Ok(())
    }
}

fn checked_sum(values: &[Decimal], what: &'static str) -> Result<Decimal, AnalyticsError> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or(AnalyticsError::Overflow(what))
}
