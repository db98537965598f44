use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use core_types::{Observation, SourceId};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use store::ObservationStore;

/// One observation as delivered by an external crawler, keyed by SKU.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationRecord {
    pub sku: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub shipping_cost: Decimal,
}

fn default_available() -> bool {
    true
}

/// Reads a JSON array of `ObservationRecord`s.
pub fn read_records(path: &Path) -> Result<Vec<ObservationRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open observation file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse observation file {}", path.display()))
}

/// Maps SKUs to catalog products, case-insensitively.
pub fn resolve(store: &ObservationStore, records: Vec<ObservationRecord>) -> Result<Vec<Observation>> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| -> Result<Observation> {
            let product = store
                .product_by_sku(&record.sku)?
                .ok_or_else(|| anyhow!("Observation #{idx}: unknown SKU '{}'", record.sku))?;
            Ok(Observation {
                product_id: product.id,
                source_id: SourceId::new(record.source),
                timestamp: record.timestamp,
                price: record.price,
                available: record.available,
                shipping_cost: record.shipping_cost,
            })
        })
        .collect()
}

/// Loads every observation in `path` into `store` as a single all-or-nothing batch.
pub fn ingest_file(store: &ObservationStore, path: &Path) -> Result<usize> {
    let records = read_records(path)?;
    let observations = resolve(store, records)?;
    let count = store
        .record_batch(observations)
        .with_context(|| format!("Rejected observations from {}", path.display()))?;
    tracing::info!(count, file = %path.display(), "Observations ingested.");
    Ok(count)
}
