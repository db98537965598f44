use crate::catalog::Catalog;
use crate::error::{StoreError, ValidationError};
use crate::query::{LatestPair, ObservationQuery, SourceFilter};
use chrono::{DateTime, Utc};
use core_types::{Observation, Product, ProductId, Source, SourceId, SourceStatus, TimeWindow};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct Inner {
    catalog: Catalog,
    /// Per-product series in ascending timestamp order; equal timestamps keep insertion order.
    series: HashMap<ProductId, Vec<Observation>>,
    len: usize,
}

impl Inner {
    fn validate(&self, obs: &Observation) -> Result<(), ValidationError> {
        if self.catalog.product(obs.product_id).is_none() {
            return Err(ValidationError::UnknownProduct(obs.product_id));
        }
        if self.catalog.source(&obs.source_id).is_none() {
            return Err(ValidationError::UnknownSource(obs.source_id.clone()));
        }
        if obs.price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice(obs.price));
        }
        if obs.shipping_cost < Decimal::ZERO {
            return Err(ValidationError::NegativeShipping(obs.shipping_cost));
        }
        Ok(())
    }

    fn insert(&mut self, obs: Observation) {
        let series = self.series.entry(obs.product_id).or_default();
        let at = series.partition_point(|o| o.timestamp <= obs.timestamp);
        series.insert(at, obs);
        self.len += 1;
    }

    fn window_slice(&self, product_id: ProductId, window: &TimeWindow) -> &[Observation] {
        match self.series.get(&product_id) {
            Some(series) => slice_between(series, window.start(), window.end()),
            None => &[],
        }
    }
}

/// The run of a time-ordered `series` with `start <= timestamp < end`.
///
/// Inverted bounds give an empty slice.
fn slice_between(series: &[Observation], start: DateTime<Utc>, end: DateTime<Utc>) -> &[Observation] {
    let lo = series.partition_point(|o| o.timestamp < start);
    let hi = series.partition_point(|o| o.timestamp < end);
    if hi < lo {
        return &[];
    }
    &series[lo..hi]
}

/// The append-only observation store.
///
/// `ObservationStore` is `Send + Sync`; share it behind an `Arc` between an
/// ingestion writer and any number of readers.
#[derive(Debug)]
pub struct ObservationStore {
    inner: RwLock<Inner>,
}

impl ObservationStore {
    pub fn new(catalog: Catalog) -> Self {
        tracing::info!(
            products = catalog.products().len(),
            sources = catalog.sources().count(),
            "Observation store initialized."
        );
        Self {
            inner: RwLock::new(Inner {
                catalog,
                series: HashMap::new(),
                len: 0,
            }),
        }
    }

    /// Validates and indexes `products` and `sources`, then builds an empty store.
    pub fn from_parts(products: Vec<Product>, sources: Vec<Source>) -> Result<Self, StoreError> {
        Ok(Self::new(Catalog::new(products, sources)?))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Appends a single observation.
    ///
    /// Fails with `StoreError::Validation` if the product or source is unknown, or
    /// if the price or shipping cost is negative. A rejected record changes nothing.
    pub fn record(&self, obs: Observation) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Err(e) = inner.validate(&obs) {
            tracing::warn!(error = %e, product = %obs.product_id, source = %obs.source_id, "Rejected observation.");
            return Err(e.into());
        }
        tracing::debug!(product = %obs.product_id, source = %obs.source_id, price = %obs.price, "Recorded observation.");
        inner.insert(obs);
        Ok(())
    }

    /// Appends a batch of observations, all or nothing.
    ///
    /// Returns the number of observations appended.
    pub fn record_batch(
        &self,
        observations: impl IntoIterator<Item = Observation>,
    ) -> Result<usize, StoreError> {
        let batch: Vec<Observation> = observations.into_iter().collect();
        let mut inner = self.write()?;
        for obs in &batch {
            if let Err(e) = inner.validate(obs) {
                tracing::warn!(error = %e, batch = batch.len(), "Rejected observation batch.");
                return Err(e.into());
            }
        }
        let count = batch.len();
        for obs in batch {
            inner.insert(obs);
        }
        tracing::debug!(count, "Recorded observation batch.");
        Ok(count)
    }

    /// Observations of `product_id` inside `window` from the sources `filter` admits.
    ///
    /// The snapshot is bounded by the window. Competitor status is read at query
    /// time, so a competitor deactivated later is still admitted by this query.
    /// An unknown product yields an empty query.
    pub fn query(
        &self,
        product_id: ProductId,
        window: TimeWindow,
        filter: SourceFilter,
    ) -> Result<ObservationQuery, StoreError> {
        let inner = self.read()?;
        let snapshot = inner.window_slice(product_id, &window).to_vec();
        let active: HashSet<SourceId> = match filter {
            SourceFilter::ActiveCompetitors => inner.catalog.active_competitors().cloned().collect(),
            _ => HashSet::new(),
        };
        Ok(ObservationQuery::new(window, filter, snapshot, active))
    }

    /// The latest observation per source (any class) for `product_id` inside `window`.
    pub fn latest_per_source(
        &self,
        product_id: ProductId,
        window: TimeWindow,
    ) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .query(product_id, window, SourceFilter::All)?
            .latest_per_source())
    }

    /// The latest and preceding observation per admitted source.
    pub fn latest_pairs(
        &self,
        product_id: ProductId,
        window: TimeWindow,
        filter: SourceFilter,
    ) -> Result<Vec<LatestPair>, StoreError> {
        Ok(self.query(product_id, window, filter)?.latest_pairs())
    }

    pub fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.catalog.product(id).cloned())
    }

    pub fn product_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.catalog.product_by_sku(sku).cloned())
    }

    /// All catalog products in load order.
    pub fn products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.catalog.products().to_vec())
    }

    pub fn source(&self, id: &SourceId) -> Result<Option<Source>, StoreError> {
        Ok(self.read()?.catalog.source(id).cloned())
    }

    /// All registered sources ordered by id.
    pub fn sources(&self) -> Result<Vec<Source>, StoreError> {
        Ok(self.read()?.catalog.sources().cloned().collect())
    }

    pub fn set_source_status(&self, id: &SourceId, status: SourceStatus) -> Result<(), StoreError> {
        self.write()?.catalog.set_source_status(id, status)?;
        tracing::info!(source = %id, %status, "Source status changed.");
        Ok(())
    }

    pub fn update_price(&self, id: ProductId, price: Decimal) -> Result<(), StoreError> {
        self.write()?.catalog.update_price(id, price)?;
        tracing::info!(product = %id, %price, "Product price updated.");
        Ok(())
    }

    /// Total number of observations recorded.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()
    }

    fn window(from: u32, to: u32) -> TimeWindow {
        TimeWindow::new(t(from), t(to)).unwrap()
    }

    fn store() -> ObservationStore {
        let products = vec![Product {
            id: ProductId(1),
            name: "Wireless Headphones Pro".to_string(),
            sku: "WHP-001".to_string(),
            current_price: dec!(299.99),
            cost: dec!(150),
            category: "Electronics".to_string(),
        }];
        let mut newegg = Source::competitor("newegg", "Newegg");
        newegg.status = SourceStatus::Inactive;
        let sources = vec![
            Source::own_store("Your Store"),
            Source::competitor("amazon", "Amazon"),
            Source::competitor("walmart", "Walmart"),
            newegg,
        ];
        ObservationStore::from_parts(products, sources).unwrap()
    }

    fn obs(source: &str, day: u32, price: Decimal) -> Observation {
        Observation::new(ProductId(1), SourceId::new(source), t(day), price)
    }

    #[test]
    fn rejects_unknown_references_and_negative_prices() {
        let store = store();
        let unknown_product = Observation::new(ProductId(7), SourceId::new("amazon"), t(1), dec!(1));
        assert!(matches!(
            store.record(unknown_product),
            Err(StoreError::Validation(ValidationError::UnknownProduct(ProductId(7))))
        ));
        assert!(matches!(
            store.record(obs("ebay", 1, dec!(1))),
            Err(StoreError::Validation(ValidationError::UnknownSource(_)))
        ));
        assert!(matches!(
            store.record(obs("amazon", 1, dec!(-0.01))),
            Err(StoreError::Validation(ValidationError::NegativePrice(_)))
        ));
        assert!(matches!(
            store.record(obs("amazon", 1, dec!(5)).with_shipping(dec!(-1))),
            Err(StoreError::Validation(ValidationError::NegativeShipping(_)))
        ));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn zero_price_is_a_valid_observation() {
        let store = store();
        store.record(obs("amazon", 1, dec!(0))).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn failed_batch_appends_nothing() {
        let store = store();
        let batch = vec![obs("amazon", 1, dec!(10)), obs("ebay", 2, dec!(11))];
        assert!(store.record_batch(batch).is_err());
        assert!(store.is_empty().unwrap());

        let batch = vec![obs("amazon", 1, dec!(10)), obs("walmart", 2, dec!(11))];
        assert_eq!(store.record_batch(batch).unwrap(), 2);
    }

    #[test]
    fn query_is_half_open_and_time_ordered() {
        let store = store();
        // Inserted out of order on purpose.
        for (day, price) in [(4, dec!(40)), (1, dec!(10)), (5, dec!(50)), (2, dec!(20))] {
            store.record(obs("amazon", day, price)).unwrap();
        }
        let query = store.query(ProductId(1), window(1, 5), SourceFilter::All).unwrap();
        let prices: Vec<_> = query.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![dec!(10), dec!(20), dec!(40)]);

        // Restartable: a second pass sees the same sequence.
        let again: Vec<_> = (&query).into_iter().map(|o| o.price).collect();
        assert_eq!(again, prices);
    }

    #[test]
    fn query_filters_by_source_class() {
        let store = store();
        store.record(obs("self", 1, dec!(100))).unwrap();
        store.record(obs("amazon", 1, dec!(90))).unwrap();
        store.record(obs("newegg", 1, dec!(80))).unwrap();

        let own = store.query(ProductId(1), window(1, 3), SourceFilter::OwnStore).unwrap();
        assert_eq!(own.iter().count(), 1);
        assert!(own.iter().all(|o| o.source_id.is_own_store()));

        let comps = store
            .query(ProductId(1), window(1, 3), SourceFilter::ActiveCompetitors)
            .unwrap();
        let ids: Vec<_> = comps.iter().map(|o| o.source_id.as_str()).collect();
        assert_eq!(ids, vec!["amazon"]);

        let all = store.query(ProductId(1), window(1, 3), SourceFilter::All).unwrap();
        assert_eq!(all.iter().count(), 3);
    }

    #[test]
    fn latest_per_source_picks_max_timestamp() {
        let store = store();
        store.record(obs("amazon", 5, dec!(45))).unwrap();
        store.record(obs("amazon", 1, dec!(50))).unwrap();
        store.record(obs("walmart", 2, dec!(52))).unwrap();

        let latest = store.latest_per_source(ProductId(1), window(1, 10)).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].source_id.as_str(), "amazon");
        assert_eq!(latest[0].price, dec!(45));
        assert_eq!(latest[1].price, dec!(52));
    }

    #[test]
    fn latest_per_source_breaks_ties_by_insertion() {
        let store = store();
        store.record(obs("amazon", 3, dec!(30))).unwrap();
        store.record(obs("amazon", 3, dec!(31))).unwrap();
        let latest = store.latest_per_source(ProductId(1), window(1, 10)).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].price, dec!(31));
    }

    #[test]
    fn latest_per_source_respects_window() {
        let store = store();
        store.record(obs("amazon", 1, dec!(50))).unwrap();
        store.record(obs("amazon", 5, dec!(45))).unwrap();
        let latest = store.latest_per_source(ProductId(1), window(1, 5)).unwrap();
        assert_eq!(latest[0].price, dec!(50));
    }

    #[test]
    fn latest_pairs_keep_previous_observation() {
        let store = store();
        store.record(obs("amazon", 1, dec!(50))).unwrap();
        store.record(obs("amazon", 2, dec!(48))).unwrap();
        store.record(obs("amazon", 3, dec!(40))).unwrap();
        store.record(obs("walmart", 2, dec!(55))).unwrap();

        let pairs = store
            .latest_pairs(ProductId(1), window(1, 10), SourceFilter::ActiveCompetitors)
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].latest.price, dec!(40));
        assert_eq!(pairs[0].previous.as_ref().map(|o| o.price), Some(dec!(48)));
        assert!(pairs[1].previous.is_none());
    }

    #[test]
    fn status_change_applies_to_later_queries() {
        let store = store();
        store.record(obs("amazon", 1, dec!(90))).unwrap();
        store
            .set_source_status(&SourceId::new("amazon"), SourceStatus::Inactive)
            .unwrap();
        let comps = store
            .query(ProductId(1), window(1, 3), SourceFilter::ActiveCompetitors)
            .unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn concurrent_writers_and_readers_see_whole_records() {
        let store = Arc::new(store());
        let writers: Vec<_> = (1..=4u32)
            .map(|day| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let o = obs("amazon", day, Decimal::from(i)).with_shipping(Decimal::from(i));
                        store.record(o).unwrap();
                    }
                })
            })
            .collect();
        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let q = store.query(ProductId(1), window(1, 10), SourceFilter::All).unwrap();
                    assert!(q.iter().all(|o| o.price == o.shipping_cost));
                }
            })
        };
        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(store.len().unwrap(), 200);
    }

    #[test]
    fn inverted_bounds_select_nothing() {
        let series: Vec<Observation> = [1, 2, 3, 4, 5]
            .into_iter()
            .map(|day| obs("amazon", day, dec!(10)))
            .collect();
        assert_eq!(slice_between(&series, t(2), t(4)).len(), 2);
        assert!(slice_between(&series, t(5), t(1)).is_empty());
        assert!(slice_between(&[], t(1), t(5)).is_empty());
    }
}
