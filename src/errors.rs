use sea_orm::error::DbErr;
use serde::Serialize;

/// Failures raised by the forecasting pipeline itself.
///
/// All variants are typed so callers can decide how to present them; the
/// engine only recovers `ModelFit` locally (naive fallback).
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastError {
    #[error("No sales data found for product {product_id}")]
    EmptySeries { product_id: String },

    #[error(
        "Not enough data to fit {model}: need at least {required} daily points, have {actual}"
    )]
    InsufficientData {
        model: String,
        required: usize,
        actual: usize,
    },

    #[error("Model fit failed: {0}")]
    ModelFit(String),

    #[error("Invalid horizon: {requested} days (must be between 1 and {max})")]
    InvalidHorizon { requested: u32, max: u32 },

    #[error("Invalid observation for {product_id} on {date}: {reason}")]
    InvalidObservation {
        product_id: String,
        date: chrono::NaiveDate,
        reason: String,
    },
}

impl ForecastError {
    /// Whether the person asking for the forecast can fix the problem
    /// (add data, change parameters) as opposed to an internal failure.
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, Self::ModelFit(_))
    }

    /// Message suitable for display, with a hint where one exists.
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientData { .. } => format!(
                "{}. Lower the model order or record more sales history.",
                self
            ),
            Self::EmptySeries { .. } => {
                format!("{}. Record sales for this SKU before forecasting.", self)
            }
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the error message suitable for end users.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn user_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::MigrationError(_) | Self::InternalError(_) => {
                "Internal error".to_string()
            }
            Self::Forecast(err) => err.user_message(),
            _ => self.to_string(),
        }
    }

    /// Process exit code used by the command-line front end.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Forecast(err) if err.is_user_correctable() => 2,
            Self::ValidationError(_) => 2,
            Self::Timeout(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_suggests_remedy() {
        let err = ForecastError::InsufficientData {
            model: "ARIMA(1,1,1)".into(),
            required: 4,
            actual: 2,
        };
        let msg = err.user_message();
        assert!(msg.contains("need at least 4"));
        assert!(msg.contains("Lower the model order"));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ServiceError::DatabaseError(DbErr::Custom("connection reset by peer".into()));
        assert_eq!(err.user_message(), "Database error");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn forecast_errors_map_to_user_exit_code() {
        let err: ServiceError = ForecastError::InvalidHorizon {
            requested: 0,
            max: 90,
        }
        .into();
        assert_eq!(err.exit_code(), 2);

        let err: ServiceError = ForecastError::ModelFit("singular".into()).into();
        assert_eq!(err.exit_code(), 1);
    }
}
