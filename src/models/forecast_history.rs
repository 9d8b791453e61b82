use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::ml::{ForecastPoint, ForecastRecord};

/// Stored forecast run. Daily points live in `predictions` as a JSON array.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forecast_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub forecast_id: Uuid,
    pub sku: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_days: i32,
    pub model: String,
    pub fallback_used: bool,
    #[sea_orm(column_type = "Text")]
    pub predictions: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_record(self) -> Result<ForecastRecord, serde_json::Error> {
        let predictions: Vec<ForecastPoint> = serde_json::from_str(&self.predictions)?;
        Ok(ForecastRecord {
            id: self.forecast_id,
            product_id: self.sku,
            generated_at: self.generated_at,
            horizon_days: u32::try_from(self.horizon_days).unwrap_or_default(),
            model: self.model,
            fallback_used: self.fallback_used,
            predictions,
        })
    }
}

impl ActiveModel {
    pub fn from_record(record: &ForecastRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            forecast_id: Set(record.id),
            sku: Set(record.product_id.clone()),
            generated_at: Set(record.generated_at),
            horizon_days: Set(i32::try_from(record.horizon_days).unwrap_or(i32::MAX)),
            model: Set(record.model.clone()),
            fallback_used: Set(record.fallback_used),
            predictions: Set(serde_json::to_string(&record.predictions)?),
            ..Default::default()
        })
    }
}
