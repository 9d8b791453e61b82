use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::forecasting::ForecastPoint;

/// A forecast day whose predicted demand exceeds the SKU's configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandAlert {
    pub product_id: String,
    pub date: NaiveDate,
    pub predicted_quantity: f64,
    pub threshold: f64,
}

/// Days where the point prediction is strictly above `threshold`.
pub fn detect_alerts(
    product_id: &str,
    predictions: &[ForecastPoint],
    threshold: f64,
) -> Vec<DemandAlert> {
    predictions
        .iter()
        .filter(|p| p.predicted_quantity > threshold)
        .map(|p| DemandAlert {
            product_id: product_id.to_string(),
            date: p.date,
            predicted_quantity: p.predicted_quantity,
            threshold,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, qty: f64) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2025, 5, day).unwrap(),
            predicted_quantity: qty,
            lower_bound: qty,
            upper_bound: qty,
        }
    }

    #[test]
    fn only_days_strictly_above_threshold_alert() {
        let predictions = vec![point(1, 90.0), point(2, 100.0), point(3, 120.5)];
        let alerts = detect_alerts("MILK-1L", &predictions, 100.0);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].date, NaiveDate::from_ymd_opt(2025, 5, 3).unwrap());
        assert_eq!(alerts[0].threshold, 100.0);
    }
}
