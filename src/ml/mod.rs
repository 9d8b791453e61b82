/*!
 * # Demand Forecasting
 *
 * Turns recorded sales into daily demand forecasts:
 *
 * - `series`: irregular observations to a gap-free daily series
 * - `model`: the pluggable model strategy traits
 * - `arima`, `additive`, `naive`: model implementations
 * - `forecasting`: the engine tying preparation, fitting and prediction together
 * - `alerts`: threshold checks over finished forecasts
 */

pub mod additive;
pub mod alerts;
pub mod arima;
pub mod forecasting;
pub mod linalg;
pub mod model;
pub mod naive;
pub mod series;

pub use alerts::{detect_alerts, DemandAlert};
pub use forecasting::{
    FittedModel, ForecastEngine, ForecastOutcome, ForecastPoint, ForecastRecord,
};
pub use model::{
    DemandModel, FallbackStrategy, FittedDemandModel, ModelKind, ModelOrder, PointForecast,
};
pub use series::{prepare_series, DateRange, Observation, Series};
