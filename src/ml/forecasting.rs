use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::additive::AdditiveModel;
use super::arima::Arima;
use super::model::{DemandModel, FittedDemandModel, ModelKind};
use super::naive::NaiveModel;
use super::series::{prepare_series, Observation, Series};
use crate::config::ForecastSettings;
use crate::errors::ForecastError;

/// Predicted demand for one future day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_quantity: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// A persisted forecast run. Never mutated; each run creates a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub id: Uuid,
    pub product_id: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_days: u32,
    pub model: String,
    pub fallback_used: bool,
    pub predictions: Vec<ForecastPoint>,
}

impl ForecastRecord {
    pub fn new(
        product_id: impl Into<String>,
        model: impl Into<String>,
        fallback_used: bool,
        predictions: Vec<ForecastPoint>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id: product_id.into(),
            // Storage keeps microseconds; truncate so records round-trip exactly.
            generated_at: Utc::now().trunc_subsecs(6),
            horizon_days: predictions.len() as u32,
            model: model.into(),
            fallback_used,
            predictions,
        }
    }

    pub fn total_predicted(&self) -> f64 {
        self.predictions.iter().map(|p| p.predicted_quantity).sum()
    }

    /// Day with the highest predicted demand.
    pub fn peak(&self) -> Option<&ForecastPoint> {
        self.predictions
            .iter()
            .max_by(|a, b| a.predicted_quantity.total_cmp(&b.predicted_quantity))
    }
}

/// A model trained on one product's series.
#[derive(Debug)]
pub struct FittedModel {
    product_id: String,
    training_start: NaiveDate,
    training_end: NaiveDate,
    inner: Box<dyn FittedDemandModel>,
}

impl FittedModel {
    pub fn new(series: &Series, inner: Box<dyn FittedDemandModel>) -> Self {
        Self {
            product_id: series.product_id().to_string(),
            training_start: series.start(),
            training_end: series.end(),
            inner,
        }
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn training_start(&self) -> NaiveDate {
        self.training_start
    }

    /// Last date of the training series; predictions start the day after.
    pub fn training_end(&self) -> NaiveDate {
        self.training_end
    }
}

/// Result of a full prepare → fit → predict run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastOutcome {
    pub product_id: String,
    pub model: String,
    pub fallback_used: bool,
    pub training_start: NaiveDate,
    pub training_end: NaiveDate,
    pub training_days: usize,
    pub predictions: Vec<ForecastPoint>,
}

impl ForecastOutcome {
    pub fn into_record(self) -> ForecastRecord {
        ForecastRecord::new(
            self.product_id,
            self.model,
            self.fallback_used,
            self.predictions,
        )
    }
}

/// Demand forecasting pipeline.
///
/// Holds configuration only. Every call works on its own series and fitted
/// model, so one engine can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    settings: ForecastSettings,
}

impl ForecastEngine {
    pub fn new(settings: ForecastSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// The configured model strategy.
    pub fn model(&self) -> Box<dyn DemandModel> {
        match self.settings.model {
            ModelKind::Arima => Box::new(Arima::new(self.settings.model_order)),
            ModelKind::Additive => Box::new(AdditiveModel::new()),
        }
    }

    pub fn fallback_model(&self) -> NaiveModel {
        NaiveModel::new(self.settings.fallback, self.settings.fallback_window_days)
    }

    pub fn prepare_series(
        &self,
        observations: &[Observation],
        product_id: &str,
    ) -> Result<Series, ForecastError> {
        prepare_series(observations, product_id)
    }

    /// Fit the configured model.
    pub fn fit(&self, series: &Series) -> Result<FittedModel, ForecastError> {
        self.fit_with(self.model().as_ref(), series)
    }

    /// Fit an explicit strategy instead of the configured one.
    pub fn fit_with(
        &self,
        model: &dyn DemandModel,
        series: &Series,
    ) -> Result<FittedModel, ForecastError> {
        debug!(
            product_id = series.product_id(),
            model = %model.name(),
            points = series.len(),
            "fitting demand model"
        );
        let inner = model.fit(series)?;
        Ok(FittedModel::new(series, inner))
    }

    pub fn validate_horizon(&self, horizon_days: u32) -> Result<(), ForecastError> {
        let max = self.settings.max_horizon_days;
        if horizon_days == 0 || horizon_days > max {
            return Err(ForecastError::InvalidHorizon {
                requested: horizon_days,
                max,
            });
        }
        Ok(())
    }

    /// Daily predictions for the `horizon_days` days after training ends.
    ///
    /// Point predictions and both bounds are floored at zero.
    pub fn predict(
        &self,
        fitted: &FittedModel,
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        self.validate_horizon(horizon_days)?;
        let z = self.settings.z_score();

        let points = fitted
            .inner
            .forecast(horizon_days as usize)
            .into_iter()
            .enumerate()
            .map(|(step, point)| {
                let spread = z * point.std_error;
                ForecastPoint {
                    date: fitted.training_end + Duration::days(step as i64 + 1),
                    predicted_quantity: floor_at_zero(point.mean),
                    lower_bound: floor_at_zero(point.mean - spread),
                    upper_bound: floor_at_zero(point.mean + spread),
                }
            })
            .collect();

        Ok(points)
    }

    /// Full pipeline with the naive fallback.
    ///
    /// Only `ModelFit` is recovered; every other error propagates.
    pub fn forecast(
        &self,
        observations: &[Observation],
        product_id: &str,
        horizon_days: u32,
    ) -> Result<ForecastOutcome, ForecastError> {
        self.validate_horizon(horizon_days)?;
        let series = self.prepare_series(observations, product_id)?;
        self.forecast_series(&series, horizon_days)
    }

    pub fn forecast_series(
        &self,
        series: &Series,
        horizon_days: u32,
    ) -> Result<ForecastOutcome, ForecastError> {
        self.validate_horizon(horizon_days)?;

        let (fitted, fallback_used) = match self.fit(series) {
            Ok(fitted) => (fitted, false),
            Err(ForecastError::ModelFit(reason)) => {
                let fallback = self.fallback_model();
                warn!(
                    product_id = series.product_id(),
                    reason = %reason,
                    fallback = %fallback.name(),
                    "model fit failed, using naive forecast"
                );
                (self.fit_with(&fallback, series)?, true)
            }
            Err(err) => return Err(err),
        };

        let predictions = self.predict(&fitted, horizon_days)?;

        Ok(ForecastOutcome {
            product_id: series.product_id().to_string(),
            model: fitted.name(),
            fallback_used,
            training_start: series.start(),
            training_end: series.end(),
            training_days: series.len(),
            predictions,
        })
    }
}

/// Round to thousandths and clamp negative demand to zero.
fn floor_at_zero(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded.is_finite() && rounded > 0.0 {
        rounded
    } else {
        0.0
    }
}
