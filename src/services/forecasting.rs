use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::config::ForecastSettings;
use crate::errors::ServiceError;
use crate::ml::{
    detect_alerts, DateRange, DemandAlert, ForecastEngine, ForecastOutcome, ForecastRecord,
    Observation,
};
use crate::repositories::{
    DemandObservationRepository, ForecastHistoryRepository, ForecastStore, ObservationSource,
};

/// Input for a forecast run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForecastRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_id: String,
    /// Defaults to the configured `default_horizon_days`
    pub horizon_days: Option<u32>,
    /// Last day of the training window; defaults to today (UTC)
    pub as_of: Option<NaiveDate>,
}

impl ForecastRequest {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            horizon_days: None,
            as_of: None,
        }
    }

    pub fn with_horizon(mut self, horizon_days: u32) -> Self {
        self.horizon_days = Some(horizon_days);
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordSaleRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_id: String,
    pub date: NaiveDate,
    #[validate(range(min = 0.0))]
    pub quantity: f64,
}

/// Saved record plus what was learned while producing it.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub record: ForecastRecord,
    pub alerts: Vec<DemandAlert>,
    pub training_start: NaiveDate,
    pub training_end: NaiveDate,
    pub training_days: usize,
}

/// Request-scoped forecasting over injected stores.
#[derive(Clone)]
pub struct ForecastingService {
    observations: Arc<dyn ObservationSource>,
    store: Arc<dyn ForecastStore>,
    settings: ForecastSettings,
}

impl ForecastingService {
    pub fn new(
        observations: Arc<dyn ObservationSource>,
        store: Arc<dyn ForecastStore>,
        settings: ForecastSettings,
    ) -> Self {
        Self {
            observations,
            store,
            settings,
        }
    }

    /// Service over the sea-orm repositories sharing one pool.
    pub fn from_connection(db: Arc<DatabaseConnection>, settings: ForecastSettings) -> Self {
        Self::new(
            Arc::new(DemandObservationRepository::new(db.clone())),
            Arc::new(ForecastHistoryRepository::new(db)),
            settings,
        )
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Loads the training window, forecasts, checks alerts and saves the record.
    #[instrument(skip(self), fields(product_id = %request.product_id))]
    pub async fn run_forecast(&self, request: ForecastRequest) -> Result<ForecastReport, ServiceError> {
        request.validate()?;

        let engine = ForecastEngine::new(self.settings.clone());
        let horizon = request
            .horizon_days
            .unwrap_or(self.settings.default_horizon_days);
        engine.validate_horizon(horizon)?;

        let as_of = request.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let window = DateRange::ending_at(as_of, self.settings.training_window_days);
        let observations = self
            .observations
            .list_observations(&request.product_id, Some(window))
            .await?;

        let outcome = self
            .run_engine(engine, observations, request.product_id.clone(), horizon)
            .await?;

        let alerts = match self.settings.alert_threshold(&request.product_id) {
            Some(threshold) => detect_alerts(&request.product_id, &outcome.predictions, threshold),
            None => Vec::new(),
        };
        for alert in &alerts {
            warn!(
                date = %alert.date,
                predicted = alert.predicted_quantity,
                threshold = alert.threshold,
                "predicted demand above alert threshold"
            );
        }

        let training_start = outcome.training_start;
        let training_end = outcome.training_end;
        let training_days = outcome.training_days;
        let record = outcome.into_record();
        self.store.save(&record).await?;

        info!(
            forecast_id = %record.id,
            model = %record.model,
            fallback_used = record.fallback_used,
            horizon_days = record.horizon_days,
            "forecast saved"
        );

        Ok(ForecastReport {
            record,
            alerts,
            training_start,
            training_end,
            training_days,
        })
    }

    /// Runs the synchronous engine, bounded by `fit_timeout_secs` when set.
    async fn run_engine(
        &self,
        engine: ForecastEngine,
        observations: Vec<Observation>,
        product_id: String,
        horizon: u32,
    ) -> Result<ForecastOutcome, ServiceError> {
        let Some(secs) = self.settings.fit_timeout_secs else {
            return Ok(engine.forecast(&observations, &product_id, horizon)?);
        };

        let task = tokio::task::spawn_blocking(move || {
            engine.forecast(&observations, &product_id, horizon)
        });

        match tokio::time::timeout(Duration::from_secs(secs), task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_error)) => Err(ServiceError::InternalError(format!(
                "forecast task failed: {}",
                join_error
            ))),
            Err(_) => {
                warn!(timeout_secs = secs, "forecast exceeded time limit");
                Err(ServiceError::Timeout(format!(
                    "model fit did not finish within {}s",
                    secs
                )))
            }
        }
    }

    /// Past forecasts for a SKU, most recent first.
    #[instrument(skip(self))]
    pub async fn history(&self, product_id: &str) -> Result<Vec<ForecastRecord>, ServiceError> {
        self.store.list_by_product(product_id).await
    }

    /// The `limit` most recent forecasts for a SKU.
    #[instrument(skip(self))]
    pub async fn latest_history(
        &self,
        product_id: &str,
        limit: u64,
    ) -> Result<Vec<ForecastRecord>, ServiceError> {
        self.store.list_latest_by_product(product_id, limit).await
    }

    #[instrument(skip(self))]
    pub async fn recent_history(&self, limit: u64) -> Result<Vec<ForecastRecord>, ServiceError> {
        self.store.list_recent(limit).await
    }

    pub async fn products(&self) -> Result<Vec<String>, ServiceError> {
        self.observations.list_products().await
    }

    #[instrument(skip(self))]
    pub async fn record_sale(&self, request: RecordSaleRequest) -> Result<(), ServiceError> {
        request.validate()?;
        self.observations
            .record(Observation::new(
                request.product_id,
                request.date,
                request.quantity,
            ))
            .await
    }
}
