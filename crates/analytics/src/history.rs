use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::{ProductId, SourceId, TimeWindow};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use store::{ObservationStore, SourceFilter};

/// The average price a source showed for a product on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub source: SourceId,
    pub average: Decimal,
    pub samples: usize,
}

/// Buckets a product's observations in `window` by day and source.
///
/// Points are ordered by date, then source id. Days without observations are absent
/// rather than filled with zeroes.
pub fn daily_series(
    store: &ObservationStore,
    product_id: ProductId,
    window: TimeWindow,
    filter: SourceFilter,
) -> Result<Vec<DailyPrice>, AnalyticsError> {
    let query = store.query(product_id, window, filter)?;

    let mut buckets: BTreeMap<(NaiveDate, &SourceId), (Decimal, usize)> = BTreeMap::new();
    for obs in query.iter() {
        let bucket = buckets
            .entry((obs.timestamp.date_naive(), &obs.source_id))
            .or_insert((Decimal::ZERO, 0));
        bucket.0 = bucket
            .0
            .checked_add(obs.price)
            .ok_or(AnalyticsError::Overflow("daily price total"))?;
        bucket.1 += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|((date, source), (sum, samples))| DailyPrice {
            date,
            source: source.clone(),
            average: sum / Decimal::from(samples),
            samples,
        })
        .collect())
}
