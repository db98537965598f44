use crate::error::AnalyticsError;
use core_types::Product;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Gross margin percentage: `(price - cost) / price * 100`.
///
/// Fails with `UndefinedMargin` when `price` is zero or negative. A cost above the
/// price yields a negative margin, which is returned as-is.
pub fn margin(price: Decimal, cost: Decimal) -> Result<Decimal, AnalyticsError> {
    if price <= Decimal::ZERO {
        return Err(AnalyticsError::UndefinedMargin(price));
    }
    price
        .checked_sub(cost)
        .and_then(|gross| percent_of(gross, price))
        .ok_or(AnalyticsError::Overflow("margin"))
}

/// `part / whole * 100`, or `None` if `whole` is zero or the result overflows.
pub(crate) fn percent_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    part.checked_div(whole)?.checked_mul(Decimal::ONE_HUNDRED)
}

/// The price at which `cost` yields a gross margin of `target_pct` percent.
pub fn price_for_margin(cost: Decimal, target_pct: Decimal) -> Result<Decimal, AnalyticsError> {
    if target_pct >= Decimal::ONE_HUNDRED {
        return Err(AnalyticsError::InvalidInput(format!(
            "target margin {target_pct}% must be below 100%"
        )));
    }
    let keep = Decimal::ONE - target_pct / Decimal::ONE_HUNDRED;
    cost.checked_div(keep)
        .ok_or(AnalyticsError::Overflow("price for target margin"))
}

/// A margin that may be undefined. Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MarginResult {
    Defined(Decimal),
    Undefined,
}

impl MarginResult {
    pub fn of(price: Decimal, cost: Decimal) -> Self {
        match margin(price, cost) {
            Ok(pct) => MarginResult::Defined(pct),
            Err(_) => MarginResult::Undefined,
        }
    }

    /// The margin of a product at its current catalog price.
    pub fn for_product(product: &Product) -> Self {
        Self::of(product.current_price, product.cost)
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            MarginResult::Defined(pct) => Some(*pct),
            MarginResult::Undefined => None,
        }
    }
}

impl fmt::Display for MarginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginResult::Defined(pct) => write!(f, "{:.1}%", pct.round_dp(1)),
            MarginResult::Undefined => write!(f, "N/A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn computes_gross_margin() {
        assert_eq!(margin(dec!(100), dec!(50)).unwrap(), dec!(50));
        assert_eq!(margin(dec!(80), dec!(60)).unwrap(), dec!(25));
        assert_eq!(margin(dec!(10), dec!(0)).unwrap(), dec!(100));
    }

    #[test]
    fn negative_margin_is_not_clamped() {
        assert_eq!(margin(dec!(100), dec!(150)).unwrap(), dec!(-50));
    }

    #[test]
    fn zero_or_negative_price_is_undefined() {
        assert_eq!(margin(dec!(0), dec!(10)), Err(AnalyticsError::UndefinedMargin(dec!(0))));
        assert!(margin(dec!(-5), dec!(1)).is_err());
        assert_eq!(MarginResult::of(dec!(0), dec!(10)), MarginResult::Undefined);
    }

    #[test]
    fn renders_undefined_as_na() {
        assert_eq!(MarginResult::Undefined.to_string(), "N/A");
        assert_eq!(MarginResult::of(dec!(299.99), dec!(150)).to_string(), "50.0%");
        assert_eq!(serde_json::to_string(&MarginResult::Undefined).unwrap(), "null");
    }

    #[test]
    fn price_for_margin_inverts_margin() {
        let price = price_for_margin(dec!(60), dec!(40)).unwrap();
        assert_eq!(price, dec!(100));
        assert_eq!(margin(price, dec!(60)).unwrap(), dec!(40));
        assert!(price_for_margin(dec!(60), dec!(100)).is_err());
    }

    #[test]
    fn extreme_inputs_report_overflow() {
        let tiny = Decimal::new(1, 28);
        assert_eq!(
            margin(tiny, Decimal::MAX),
            Err(AnalyticsError::Overflow("margin"))
        );
        assert_eq!(MarginResult::of(tiny, Decimal::MAX), MarginResult::Undefined);
        assert_eq!(
            price_for_margin(Decimal::MAX, dec!(99.9)),
            Err(AnalyticsError::Overflow("price for target margin"))
        );
    }
}
