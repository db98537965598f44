use crate::error::{StoreError, ValidationError};
use core_types::{Product, ProductId, Source, SourceId, SourceStatus};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// The validated product catalog and source registry.
///
/// Products are kept in load order; lookups go through id and SKU indexes.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: HashMap<ProductId, usize>,
    by_sku: HashMap<String, ProductId>,
    sources: BTreeMap<SourceId, Source>,
}

impl Catalog {
    /// Validates and indexes a catalog.
    ///
    /// Rejects duplicate product ids, SKUs that collide ignoring case, non-positive
    /// prices, negative costs, duplicate source ids, and any registry that does not
    /// hold exactly one own store under the `"self"` id.
    pub fn new(products: Vec<Product>, sources: Vec<Source>) -> Result<Self, ValidationError> {
        let mut by_id = HashMap::with_capacity(products.len());
        let mut by_sku = HashMap::with_capacity(products.len());

        for (idx, product) in products.iter().enumerate() {
            if product.current_price <= Decimal::ZERO {
                return Err(ValidationError::InvalidProduct(
                    product.id,
                    format!("current price {} must be positive", product.current_price),
                ));
            }
            if product.cost < Decimal::ZERO {
                return Err(ValidationError::InvalidProduct(
                    product.id,
                    format!("cost {} must not be negative", product.cost),
                ));
            }
            if by_id.insert(product.id, idx).is_some() {
                return Err(ValidationError::DuplicateProductId(product.id));
            }
            if by_sku.insert(sku_key(&product.sku), product.id).is_some() {
                return Err(ValidationError::DuplicateSku(product.sku.clone()));
            }
        }

        let mut registry = BTreeMap::new();
        for source in sources {
            if registry.contains_key(&source.id) {
                return Err(ValidationError::DuplicateSource(source.id));
            }
            registry.insert(source.id.clone(), source);
        }

        let own_stores = registry.values().filter(|s| s.is_own_store()).count();
        let sentinel_ok = registry
            .get(&SourceId::own_store())
            .is_some_and(Source::is_own_store);
        if own_stores != 1 || !sentinel_ok {
            return Err(ValidationError::OwnStore(own_stores));
        }

        Ok(Self {
            products,
            by_id,
            by_sku,
            sources: registry,
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.by_id.get(&id).map(|&idx| &self.products[idx])
    }

    /// Looks a product up by SKU, ignoring case and surrounding whitespace.
    pub fn product_by_sku(&self, sku: &str) -> Option<&Product> {
        self.by_sku
            .get(&sku_key(sku))
            .and_then(|id| self.product(*id))
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    pub fn source(&self, id: &SourceId) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Ids of every competitor currently marked active.
    pub fn active_competitors(&self) -> impl Iterator<Item = &SourceId> {
        self.sources
            .values()
            .filter(|s| s.is_active_competitor())
            .map(|s| &s.id)
    }

    /// Applies a pricing update to a product's current price.
    pub fn update_price(&mut self, id: ProductId, price: Decimal) -> Result<(), StoreError> {
        if price <= Decimal::ZERO {
            return Err(ValidationError::InvalidProduct(
                id,
                format!("current price {price} must be positive"),
            )
            .into());
        }
        let idx = *self.by_id.get(&id).ok_or(StoreError::UnknownProduct(id))?;
        self.products[idx].current_price = price;
        Ok(())
    }

    /// Activates or deactivates a competitor. The own store has no status to toggle.
    pub fn set_source_status(
        &mut self,
        id: &SourceId,
        status: SourceStatus,
    ) -> Result<(), StoreError> {
        let source = self
            .sources
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownSource(id.clone()))?;
        if source.is_own_store() {
            return Err(ValidationError::OwnStore(1).into());
        }
        source.status = status;
        Ok(())
    }
}

fn sku_key(sku: &str) -> String {
    sku.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(id: u64, sku: &str) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Product {id}"),
            sku: sku.to_string(),
            current_price: dec!(100),
            cost: dec!(40),
            category: "Audio".to_string(),
        }
    }

    fn registry() -> Vec<Source> {
        vec![
            Source::own_store("Your Store"),
            Source::competitor("amazon", "Amazon"),
            Source::competitor("bestbuy", "Best Buy"),
        ]
    }

    #[test]
    fn indexes_products_by_sku_case_insensitively() {
        let catalog = Catalog::new(vec![product(1, "WHP-001"), product(2, "SWX-200")], registry())
            .unwrap();
        assert_eq!(catalog.product_by_sku("whp-001").map(|p| p.id), Some(ProductId(1)));
        assert_eq!(catalog.product_by_sku("SWX-200 ").map(|p| p.id), Some(ProductId(2)));
        assert!(catalog.product_by_sku("nope").is_none());
    }

    #[test]
    fn rejects_sku_collision_ignoring_case() {
        let err = Catalog::new(vec![product(1, "WHP-001"), product(2, "whp-001")], registry())
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateSku(_)));
    }

    #[test]
    fn rejects_duplicate_product_id() {
        let err = Catalog::new(vec![product(1, "A"), product(1, "B")], registry()).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateProductId(ProductId(1)));
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut free = product(1, "A");
        free.current_price = Decimal::ZERO;
        assert!(matches!(
            Catalog::new(vec![free], registry()),
            Err(ValidationError::InvalidProduct(_, _))
        ));
    }

    #[test]
    fn requires_exactly_one_own_store() {
        let no_self = vec![Source::competitor("amazon", "Amazon")];
        assert_eq!(
            Catalog::new(vec![], no_self).unwrap_err(),
            ValidationError::OwnStore(0)
        );

        let mut second = Source::own_store("Outlet");
        second.id = SourceId::new("outlet");
        let two = vec![Source::own_store("Main"), second];
        assert_eq!(Catalog::new(vec![], two).unwrap_err(), ValidationError::OwnStore(2));
    }

    #[test]
    fn toggling_status_updates_active_set() {
        let mut catalog = Catalog::new(vec![], registry()).unwrap();
        assert_eq!(catalog.active_competitors().count(), 2);

        catalog
            .set_source_status(&SourceId::new("amazon"), SourceStatus::Inactive)
            .unwrap();
        let active: Vec<_> = catalog.active_competitors().cloned().collect();
        assert_eq!(active, vec![SourceId::new("bestbuy")]);

        assert!(catalog
            .set_source_status(&SourceId::own_store(), SourceStatus::Inactive)
            .is_err());
        assert_eq!(
            catalog.set_source_status(&SourceId::new("ebay"), SourceStatus::Active),
            Err(StoreError::UnknownSource(SourceId::new("ebay")))
        );
    }

    #[test]
    fn update_price_requires_positive_value() {
        let mut catalog = Catalog::new(vec![product(1, "A")], registry()).unwrap();
        catalog.update_price(ProductId(1), dec!(89.99)).unwrap();
        assert_eq!(catalog.product(ProductId(1)).unwrap().current_price, dec!(89.99));
        assert!(catalog.update_price(ProductId(1), dec!(0)).is_err());
        assert_eq!(
            catalog.update_price(ProductId(9), dec!(10)),
            Err(StoreError::UnknownProduct(ProductId(9)))
        );
    }
}
