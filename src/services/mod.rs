pub mod forecasting;

pub use forecasting::{ForecastReport, ForecastRequest, ForecastingService, RecordSaleRequest};
