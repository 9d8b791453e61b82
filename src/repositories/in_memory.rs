//! Process-local stores for tests, demos and one-off CLI runs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::ServiceError;
use crate::ml::{DateRange, ForecastRecord, Observation};

use super::{validate_observation, ForecastStore, ObservationSource};

#[derive(Debug, Default)]
pub struct InMemoryObservationSource {
    by_product: DashMap<String, Vec<Observation>>,
}

impl InMemoryObservationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observations(observations: impl IntoIterator<Item = Observation>) -> Self {
        let source = Self::new();
        for observation in observations {
            source
                .by_product
                .entry(observation.product_id.clone())
                .or_default()
                .push(observation);
        }
        source
    }
}

#[async_trait]
impl ObservationSource for InMemoryObservationSource {
    async fn list_observations(
        &self,
        product_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<Observation>, ServiceError> {
        let observations = self
            .by_product
            .get(product_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|obs| range.map_or(true, |r| r.contains(obs.date)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(observations)
    }

    async fn list_products(&self) -> Result<Vec<String>, ServiceError> {
        let mut products: Vec<String> = self
            .by_product
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        products.sort();
        Ok(products)
    }

    async fn record(&self, observation: Observation) -> Result<(), ServiceError> {
        validate_observation(&observation)?;
        self.by_product
            .entry(observation.product_id.clone())
            .or_default()
            .push(observation);
        Ok(())
    }
}

/// Records keep their insertion sequence so same-timestamp runs still list
/// newest first.
#[derive(Debug, Default)]
pub struct InMemoryForecastStore {
    records: DashMap<String, Vec<(u64, ForecastRecord)>>,
    sequence: AtomicU64,
}

impl InMemoryForecastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn newest_first(records: &mut [(u64, ForecastRecord)]) {
    records.sort_by(|(seq_a, a), (seq_b, b)| {
        b.generated_at
            .cmp(&a.generated_at)
            .then_with(|| seq_b.cmp(seq_a))
    });
}

#[async_trait]
impl ForecastStore for InMemoryForecastStore {
    async fn save(&self, record: &ForecastRecord) -> Result<(), ServiceError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.records
            .entry(record.product_id.clone())
            .or_default()
            .push((seq, record.clone()));
        Ok(())
    }

    async fn list_by_product(&self, product_id: &str) -> Result<Vec<ForecastRecord>, ServiceError> {
        let mut records = self
            .records
            .get(product_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        newest_first(&mut records);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    async fn list_latest_by_product(
        &self,
        product_id: &str,
        limit: u64,
    ) -> Result<Vec<ForecastRecord>, ServiceError> {
        let mut records = self.list_by_product(product_id).await?;
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<ForecastRecord>, ServiceError> {
        let mut records: Vec<(u64, ForecastRecord)> = self
            .records
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();
        newest_first(&mut records);
        Ok(records
            .into_iter()
            .take(limit as usize)
            .map(|(_, record)| record)
            .collect())
    }
}
