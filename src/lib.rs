//! Dairy demand forecasting library
//!
//! Prepares recorded SKU sales into daily demand series, fits ARIMA or
//! additive trend/seasonality models and keeps a history of forecast runs.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod errors;
pub mod migrator;
pub mod ml;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::{AppConfig, ForecastSettings};
pub use errors::{ForecastError, ServiceError};
pub use ml::{
    ForecastEngine, ForecastPoint, ForecastRecord, ModelKind, ModelOrder, Observation, Series,
};
pub use services::{ForecastReport, ForecastRequest, ForecastingService};
