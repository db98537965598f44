use crate::error::AnalyticsError;
use crate::margin::{MarginResult, percent_of, price_for_margin};
use crate::position::{Position, PositionResult};
use configuration::{PricingRule, RuleKind};
use core_types::Product;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Which limit, if any, decided the suggested price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceBound {
    Unbounded,
    Floor,
    MinMargin,
    Ceiling,
}

/// An advisory price change. Nothing is applied to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSuggestion {
    pub rule_id: u32,
    pub sku: String,
    pub current_price: Decimal,
    pub suggested_price: Decimal,
    /// Relative change from the current price, `None` if the current price is not
    /// positive or the change does not fit in a `Decimal`.
    pub change_pct: Option<Decimal>,
    pub margin: MarginResult,
    pub bound: PriceBound,
}

/// Evaluates pricing rules against a product's competitive position.
#[derive(Debug, Default)]
pub struct RepricingAdvisor {}

impl RepricingAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suggests a price for `product` under `rule`.
    ///
    /// Competitor-driven rules return `Ok(None)` when the position is `NoData`.
    /// The target price is raised to the floor and to the minimum-margin price, then
    /// capped at the ceiling, so the ceiling always wins.
    pub fn suggest(
        &self,
        rule: &PricingRule,
        product: &Product,
        position: &PositionResult,
    ) -> Result<Option<PriceSuggestion>, AnalyticsError> {
        if !rule.active {
            return Err(AnalyticsError::RuleInactive(rule.id));
        }
        if !product.matches_sku(&rule.sku) || position.product_id != product.id {
            return Err(AnalyticsError::InvalidRule(
                rule.id,
                format!("rule targets {} but product is {}", rule.sku, product.sku),
            ));
        }

        let competitor_min = match position.position {
            Position::NoData => None,
            _ => position.competitor_min,
        };

        let target = match rule.kind {
            RuleKind::MatchLowest => competitor_min,
            RuleKind::BeatBy { percent } => competitor_min
                .map(|min| {
                    min.checked_mul(Decimal::ONE - percent / Decimal::ONE_HUNDRED)
                        .ok_or(AnalyticsError::Overflow("beat-by target"))
                })
                .transpose()?,
            RuleKind::FixedMargin { target_margin_pct } => {
                Some(price_for_margin(product.cost, target_margin_pct)?)
            }
        };
        let Some(target) = target else {
            tracing::debug!(rule = rule.id, sku = %product.sku, "No competitor data; no suggestion.");
            return Ok(None);
        };

        let mut price = target;
        let mut bound = PriceBound::Unbounded;

        if price < rule.floor_price {
            price = rule.floor_price;
            bound = PriceBound::Floor;
        }
        if let Some(min_margin) = rule.min_margin_pct {
            let margin_price = price_for_margin(product.cost, min_margin)?;
            if price < margin_price {
                price = margin_price;
                bound = PriceBound::MinMargin;
            }
        }
        if price > rule.ceiling_price {
            price = rule.ceiling_price;
            bound = PriceBound::Ceiling;
        }

        // Round up when the margin floor decided the price, so rounding cannot dip below it.
        let suggested_price = match bound {
            PriceBound::MinMargin => price.round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity),
            _ => price.round_dp(2),
        };

        let change_pct = if product.current_price > Decimal::ZERO {
            suggested_price
                .checked_sub(product.current_price)
                .and_then(|delta| percent_of(delta, product.current_price))
        } else {
            None
        };

        tracing::debug!(
            rule = rule.id,
            sku = %product.sku,
            %suggested_price,
            ?bound,
            "Price suggested."
        );

        Ok(Some(PriceSuggestion {
            rule_id: rule.id,
            sku: product.sku.clone(),
            current_price: product.current_price,
            suggested_price,
            change_pct,
            margin: MarginResult::of(suggested_price, product.cost),
            bound,
        }))
    }
}
