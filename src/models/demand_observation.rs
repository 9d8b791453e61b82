use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::ml::Observation;

/// One recorded sale (or daily total) for a SKU.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "demand_observations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub sku: String,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn to_observation(&self) -> Observation {
        Observation::new(
            self.sku.clone(),
            self.date,
            self.quantity.to_f64().unwrap_or(0.0),
        )
    }
}

impl ActiveModel {
    /// Insertable row for an observation. `None` when the quantity has no
    /// decimal representation (NaN or infinite).
    pub fn from_observation(observation: &Observation) -> Option<Self> {
        let quantity = Decimal::from_f64(observation.quantity)?;
        Some(Self {
            sku: Set(observation.product_id.clone()),
            date: Set(observation.date),
            quantity: Set(quantity),
            recorded_at: Set(Utc::now()),
            ..Default::default()
        })
    }
}
