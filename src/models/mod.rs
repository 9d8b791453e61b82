// Storage models
pub mod demand_observation;
pub mod forecast_history;

pub use demand_observation::Entity as DemandObservation;
pub use forecast_history::Entity as ForecastHistory;
