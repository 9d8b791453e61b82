use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::errors::ServiceError;
use crate::ml::{DateRange, Observation};
use crate::models::demand_observation::{
    ActiveModel as ObservationActiveModel, Column, Entity as DemandObservation,
};
use crate::repositories::Repository;

use super::{validate_observation, BaseRepository, ObservationSource};

/// Rows per INSERT statement; four bind parameters each.
const INSERT_BATCH_SIZE: usize = 1000;

/// Sales history backed by the `demand_observations` table.
#[derive(Debug, Clone)]
pub struct DemandObservationRepository {
    base: BaseRepository,
}

impl DemandObservationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Insert many observations atomically, in batches that stay under the
    /// database's bind-parameter limit.
    #[instrument(skip(self, observations), fields(count = observations.len()))]
    pub async fn insert_many(&self, observations: &[Observation]) -> Result<u64, ServiceError> {
        if observations.is_empty() {
            return Ok(0);
        }
        for observation in observations {
            validate_observation(observation)?;
        }

        let txn = self.base.get_db().begin().await?;
        for batch in observations.chunks(INSERT_BATCH_SIZE) {
            let rows = batch
                .iter()
                .map(to_active_model)
                .collect::<Result<Vec<_>, _>>()?;
            DemandObservation::insert_many(rows).exec(&txn).await?;
        }
        txn.commit().await?;

        debug!(rows = observations.len(), "observations inserted");
        Ok(observations.len() as u64)
    }
}

fn to_active_model(observation: &Observation) -> Result<ObservationActiveModel, ServiceError> {
    ObservationActiveModel::from_observation(observation).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "quantity {} cannot be stored as a decimal",
            observation.quantity
        ))
    })
}

#[async_trait]
impl ObservationSource for DemandObservationRepository {
    #[instrument(skip(self))]
    async fn list_observations(
        &self,
        product_id: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<Observation>, ServiceError> {
        let mut query = DemandObservation::find().filter(Column::Sku.eq(product_id));
        if let Some(range) = range {
            query = query
                .filter(Column::Date.gte(range.start))
                .filter(Column::Date.lte(range.end));
        }

        let rows = query
            .order_by_asc(Column::Date)
            .order_by_asc(Column::Id)
            .all(self.base.get_db())
            .await?;

        debug!(rows = rows.len(), "loaded demand observations");
        Ok(rows.iter().map(|row| row.to_observation()).collect())
    }

    async fn list_products(&self) -> Result<Vec<String>, ServiceError> {
        let skus: Vec<String> = DemandObservation::find()
            .select_only()
            .column(Column::Sku)
            .distinct()
            .order_by_asc(Column::Sku)
            .into_tuple()
            .all(self.base.get_db())
            .await?;
        Ok(skus)
    }

    #[instrument(skip(self), fields(product_id = %observation.product_id))]
    async fn record(&self, observation: Observation) -> Result<(), ServiceError> {
        validate_observation(&observation)?;
        to_active_model(&observation)?
            .insert(self.base.get_db())
            .await?;
        Ok(())
    }
}
