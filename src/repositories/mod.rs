use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::ml::{DateRange, ForecastRecord, Observation};

pub mod forecast_history_repository;
pub mod in_memory;
pub mod observation_repository;

pub use forecast_history_repository::ForecastHistoryRepository;
pub use in_memory::{InMemoryForecastStore, InMemoryObservationSource};
pub use observation_repository::DemandObservationRepository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Where historical sales come from.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Observations for one SKU, optionally limited to an inclusive date range.
    async fn list_observations(
        &self,
        product_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<Observation>, ServiceError>;

    /// Distinct SKUs with at least one observation, sorted.
    async fn list_products(&self) -> Result<Vec<String>, ServiceError>;

    async fn record(&self, observation: Observation) -> Result<(), ServiceError>;
}

/// Where finished forecasts are kept for history display.
#[async_trait]
pub trait ForecastStore: Send + Sync {
    async fn save(&self, record: &ForecastRecord) -> Result<(), ServiceError>;

    /// All runs for a SKU, most recent first.
    async fn list_by_product(&self, product_id: &str) -> Result<Vec<ForecastRecord>, ServiceError>;

    /// The `limit` most recent runs for a SKU, most recent first.
    async fn list_latest_by_product(
        &self,
        product_id: &str,
        limit: u64,
    ) -> Result<Vec<ForecastRecord>, ServiceError>;

    /// Latest runs across every SKU, most recent first.
    async fn list_recent(&self, limit: u64) -> Result<Vec<ForecastRecord>, ServiceError>;
}

/// Shared check applied before any observation is stored.
pub(crate) fn validate_observation(observation: &Observation) -> Result<(), ServiceError> {
    if observation.product_id.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "product id must not be empty".to_string(),
        ));
    }
    if !observation.quantity.is_finite() || observation.quantity < 0.0 {
        return Err(ServiceError::ValidationError(format!(
            "quantity must be a non-negative number, got {}",
            observation.quantity
        )));
    }
    Ok(())
}
