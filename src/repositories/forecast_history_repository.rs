use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use std::sync::Arc;
use tracing::instrument;

use crate::errors::ServiceError;
use crate::ml::ForecastRecord;
use crate::models::forecast_history::{
    ActiveModel as ForecastHistoryActiveModel, Column, Entity as ForecastHistory,
    Model as ForecastHistoryModel,
};
use crate::repositories::Repository;

use super::{BaseRepository, ForecastStore};

/// Forecast runs backed by the `forecast_history` table.
#[derive(Debug, Clone)]
pub struct ForecastHistoryRepository {
    base: BaseRepository,
}

impl ForecastHistoryRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

fn newest_for_sku(product_id: &str) -> Select<ForecastHistory> {
    ForecastHistory::find()
        .filter(Column::Sku.eq(product_id))
        .order_by_desc(Column::GeneratedAt)
        .order_by_desc(Column::Id)
}

fn into_records(rows: Vec<ForecastHistoryModel>) -> Result<Vec<ForecastRecord>, ServiceError> {
    rows.into_iter()
        .map(|row| row.into_record().map_err(ServiceError::from))
        .collect()
}

#[async_trait]
impl ForecastStore for ForecastHistoryRepository {
    #[instrument(skip(self, record), fields(forecast_id = %record.id, product_id = %record.product_id))]
    async fn save(&self, record: &ForecastRecord) -> Result<(), ServiceError> {
        ForecastHistoryActiveModel::from_record(record)?
            .insert(self.base.get_db())
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_by_product(&self, product_id: &str) -> Result<Vec<ForecastRecord>, ServiceError> {
        let rows = newest_for_sku(product_id).all(self.base.get_db()).await?;
        into_records(rows)
    }

    #[instrument(skip(self))]
    async fn list_latest_by_product(
        &self,
        product_id: &str,
        limit: u64,
    ) -> Result<Vec<ForecastRecord>, ServiceError> {
        let rows = newest_for_sku(product_id)
            .limit(limit)
            .all(self.base.get_db())
            .await?;
        into_records(rows)
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, limit: u64) -> Result<Vec<ForecastRecord>, ServiceError> {
        let rows = ForecastHistory::find()
            .order_by_desc(Column::GeneratedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(self.base.get_db())
            .await?;
        into_records(rows)
    }
}
