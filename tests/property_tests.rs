//! Property-based tests for series preparation and forecasting.
//!
//! These tests use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use dairy_forecast::{
    config::ForecastSettings,
    ml::{prepare_series, ForecastEngine, ModelKind, Observation},
};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn quantity_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), 0.0f64..500.0]
}

/// Sales on arbitrary days within `max_offset` days of the base date.
fn observations_strategy(max_offset: i64) -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec((0..max_offset, quantity_strategy()), 1..80).prop_map(|sales| {
        sales
            .into_iter()
            .map(|(offset, qty)| Observation::new("MILK-1L", base_date() + Duration::days(offset), qty))
            .collect()
    })
}

/// A daily history of at least `min_len` days with noisy, non-negative demand.
fn history_strategy(min_len: usize) -> impl Strategy<Value = Vec<Observation>> {
    prop::collection::vec(quantity_strategy(), min_len..90).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, qty)| Observation::new("CURD-500G", base_date() + Duration::days(i as i64), qty))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn series_is_contiguous_and_spans_observed_range(observations in observations_strategy(120)) {
        let series = prepare_series(&observations, "MILK-1L").unwrap();

        let first = observations.iter().map(|o| o.date).min().unwrap();
        let last = observations.iter().map(|o| o.date).max().unwrap();

        prop_assert_eq!(series.start(), first);
        prop_assert_eq!(series.end(), last);
        prop_assert_eq!(series.len() as i64, (last - first).num_days() + 1);

        let dates: Vec<NaiveDate> = series.iter().map(|(d, _)| d).collect();
        for pair in dates.windows(2) {
            prop_assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn series_preserves_total_demand(observations in observations_strategy(60)) {
        let series = prepare_series(&observations, "MILK-1L").unwrap();
        let expected: f64 = observations.iter().map(|o| o.quantity).sum();
        prop_assert!((series.total() - expected).abs() < 1e-6 * expected.max(1.0));
    }

    #[test]
    fn other_products_never_leak_into_series(
        observations in observations_strategy(30),
        noise in prop::collection::vec((0i64..30, 0.0f64..100.0), 0..20),
    ) {
        let mut mixed = observations.clone();
        mixed.extend(
            noise
                .into_iter()
                .map(|(offset, qty)| Observation::new("GHEE-1KG", base_date() + Duration::days(offset), qty)),
        );

        let clean = prepare_series(&observations, "MILK-1L").unwrap();
        let from_mixed = prepare_series(&mixed, "MILK-1L").unwrap();
        prop_assert_eq!(clean, from_mixed);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arima_predictions_are_never_negative(
        history in history_strategy(4),
        horizon in 1u32..=90,
    ) {
        let engine = ForecastEngine::new(ForecastSettings::default());
        let outcome = engine.forecast(&history, "CURD-500G", horizon).unwrap();

        prop_assert_eq!(outcome.predictions.len(), horizon as usize);
        for point in &outcome.predictions {
            prop_assert!(point.predicted_quantity >= 0.0);
            prop_assert!(point.lower_bound >= 0.0);
            prop_assert!(point.upper_bound >= point.predicted_quantity);
            prop_assert!(point.lower_bound <= point.predicted_quantity);
        }
    }

    #[test]
    fn additive_predictions_are_never_negative(
        history in history_strategy(14),
        horizon in 1u32..=30,
    ) {
        let engine = ForecastEngine::new(ForecastSettings {
            model: ModelKind::Additive,
            ..Default::default()
        });
        let outcome = engine.forecast(&history, "CURD-500G", horizon).unwrap();

        let first = outcome.training_end + Duration::days(1);
        prop_assert_eq!(outcome.predictions[0].date, first);
        prop_assert!(outcome.predictions.iter().all(|p| p.predicted_quantity >= 0.0));
    }
}
