use crate::error::AnalyticsError;
use crate::margin::percent_of;
use configuration::AnalysisSettings;
use core_types::{Observation, Product, ProductId, SourceId, TimeWindow};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use store::{ObservationStore, SourceFilter};

/// Where a product's price sits relative to its active competitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Position {
    Lowest,
    Competitive,
    Higher,
    NoData,
}

impl Position {
    /// Classifies `price` against competitor `min` and `avg`.
    ///
    /// Rules are evaluated in order and ties go to the seller: a price equal to the
    /// minimum is `Lowest`, a price equal to the average is `Competitive`.
    pub fn classify(price: Decimal, min: Option<Decimal>, avg: Option<Decimal>) -> Self {
        match (min, avg) {
            (Some(min), Some(avg)) => {
                if price <= min {
                    Position::Lowest
                } else if price <= avg {
                    Position::Competitive
                } else {
                    Position::Higher
                }
            }
            _ => Position::NoData,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Position::Lowest => "Lowest",
            Position::Competitive => "Competitive",
            Position::Higher => "Higher",
            Position::NoData => "No Data",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which price the classification was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceBasis {
    /// The latest own-store observation in the window.
    Observed,
    /// No own-store observation in the window; the catalog price was used.
    Catalog,
}

/// The competitive position of one product over one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionResult {
    pub product_id: ProductId,
    pub sku: String,
    pub window: TimeWindow,
    /// Latest own-store price in the window, `None` when there is none.
    pub own_price: Option<Decimal>,
    /// The price that was classified. Equals `own_price` when one was observed.
    pub reference_price: Decimal,
    pub price_basis: PriceBasis,
    pub competitor_min: Option<Decimal>,
    pub competitor_avg: Option<Decimal>,
    pub competitor_max: Option<Decimal>,
    /// Active competitors whose latest offer was compared.
    pub competitor_count: usize,
    /// Active competitors whose latest offer was out of stock and left out because
    /// `include_unavailable` is off. Such a product can be `NoData` with this above zero.
    pub unavailable_excluded: usize,
    pub cheapest_source: Option<SourceId>,
    /// `(reference - avg) / avg * 100`; `None` if there is no average, it is zero,
    /// or the ratio does not fit in a `Decimal`.
    pub percent_diff: Option<Decimal>,
    pub position: Position,
}

/// Computes `PositionResult`s from the observation store.
///
/// Competitor figures use only the latest observation per active competitor within
/// the window, so a competitor that reported twice is counted once.
#[derive(Debug, Clone)]
pub struct PositionAnalyzer<'a> {
    store: &'a ObservationStore,
    settings: AnalysisSettings,
}

impl<'a> PositionAnalyzer<'a> {
    pub fn new(store: &'a ObservationStore, settings: AnalysisSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &'a ObservationStore {
        self.store
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Analyzes a catalog product looked up by id.
    pub fn analyze_by_id(
        &self,
        product_id: ProductId,
        window: TimeWindow,
    ) -> Result<PositionResult, AnalyticsError> {
        let product = self
            .store
            .product(product_id)?
            .ok_or(AnalyticsError::UnknownProduct(product_id))?;
        self.analyze(&product, window)
    }

    /// Analyzes `product` over `window`.
    ///
    /// A product with no observations at all simply comes back as `NoData`.
    pub fn analyze(
        &self,
        product: &Product,
        window: TimeWindow,
    ) -> Result<PositionResult, AnalyticsError> {
        let own_price = self
            .store
            .query(product.id, window, SourceFilter::OwnStore)?
            .iter()
            .last()
            .map(|obs| self.effective_price(obs))
            .transpose()?;

        let (competitors, unavailable): (Vec<Observation>, Vec<Observation>) = self
            .store
            .query(product.id, window, SourceFilter::ActiveCompetitors)?
            .latest_per_source()
            .into_iter()
            .partition(|obs| self.settings.include_unavailable || obs.available);

        let (reference_price, price_basis) = match own_price {
            Some(price) => (price, PriceBasis::Observed),
            None => (product.current_price, PriceBasis::Catalog),
        };

        let mut result = PositionResult {
            product_id: product.id,
            sku: product.sku.clone(),
            window,
            own_price,
            reference_price,
            price_basis,
            competitor_min: None,
            competitor_avg: None,
            competitor_max: None,
            competitor_count: competitors.len(),
            unavailable_excluded: unavailable.len(),
            cheapest_source: None,
            percent_diff: None,
            position: Position::NoData,
        };

        self.calculate_competitor_stats(&competitors, &mut result)?;
        self.calculate_percent_diff(&mut result);
        result.position = Position::classify(
            result.reference_price,
            result.competitor_min,
            result.competitor_avg,
        );

        tracing::debug!(
            sku = %result.sku,
            window = %window,
            competitors = result.competitor_count,
            position = %result.position,
            "Position analyzed."
        );
        Ok(result)
    }

    /// Fills min, average and max over the competitors' latest prices.
    fn calculate_competitor_stats(
        &self,
        competitors: &[Observation],
        result: &mut PositionResult,
    ) -> Result<(), AnalyticsError> {
        if competitors.is_empty() {
            return Ok(());
        }

        let mut sum = Decimal::ZERO;
        let mut cheapest: Option<(&SourceId, Decimal)> = None;
        let mut max = Decimal::MIN;

        for obs in competitors {
            let price = self.effective_price(obs)?;
            sum = sum
                .checked_add(price)
                .ok_or(AnalyticsError::Overflow("competitor price total"))?;
            if price > max {
                max = price;
            }
            // Strict comparison keeps the first source (by id) on a tie.
            if cheapest.is_none_or(|(_, min)| price < min) {
                cheapest = Some((&obs.source_id, price));
            }
        }

        if let Some((source, min)) = cheapest {
            result.competitor_min = Some(min);
            result.cheapest_source = Some(source.clone());
        }
        result.competitor_max = Some(max);
        result.competitor_avg = Some(sum / Decimal::from(competitors.len()));
        Ok(())
    }

    fn calculate_percent_diff(&self, result: &mut PositionResult) {
        result.percent_diff = result
            .competitor_avg
            .filter(|avg| !avg.is_zero())
            .and_then(|avg| percent_of(result.reference_price.checked_sub(avg)?, avg));
    }

    fn effective_price(&self, obs: &Observation) -> Result<Decimal, AnalyticsError> {
        if self.settings.include_shipping {
            obs.landed_price().ok_or(AnalyticsError::Overflow("landed price"))
        } else {
            Ok(obs.price)
        }
    }
}
