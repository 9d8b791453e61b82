mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use rstest::rstest;

use dairy_forecast::{
    config::ForecastSettings,
    errors::ForecastError,
    ml::{ForecastEngine, ModelKind, ModelOrder, Observation},
};

use common::{daily, date};

fn engine() -> ForecastEngine {
    ForecastEngine::new(ForecastSettings::default())
}

#[test]
fn series_covers_every_day_between_first_and_last_sale() {
    let observations = vec![
        Observation::new("MILK-1L", date(2025, 1, 10), 5.0),
        Observation::new("MILK-1L", date(2025, 1, 1), 2.0),
        Observation::new("MILK-1L", date(2025, 1, 4), 1.0),
    ];
    let series = engine().prepare_series(&observations, "MILK-1L").unwrap();

    assert_eq!(series.len(), 10);
    let dates: Vec<_> = series.iter().map(|(d, _)| d).collect();
    for pair in dates.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::days(1));
    }
    assert_eq!(series.values().iter().filter(|v| **v == 0.0).count(), 7);
}

#[test]
fn same_day_sales_are_summed() {
    let observations = vec![
        Observation::new("CURD-500G", date(2025, 2, 1), 3.0),
        Observation::new("CURD-500G", date(2025, 2, 1), 4.0),
    ];
    let series = engine().prepare_series(&observations, "CURD-500G").unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.get(date(2025, 2, 1)), Some(7.0));
}

#[test]
fn no_sales_for_product_is_empty_series() {
    assert_matches!(
        engine().prepare_series(&[], "X"),
        Err(ForecastError::EmptySeries { product_id }) if product_id == "X"
    );
}

#[rstest]
#[case(0, false)]
#[case(1, true)]
#[case(90, true)]
#[case(91, false)]
fn horizon_is_bounded_by_configured_maximum(#[case] horizon: u32, #[case] ok: bool) {
    let engine = engine();
    let series = engine
        .prepare_series(&daily("MILK-1L", date(2025, 1, 1), &[100.0; 30]), "MILK-1L")
        .unwrap();
    let fitted = engine.fit(&series).unwrap();

    let result = engine.predict(&fitted, horizon);
    if ok {
        assert_eq!(result.unwrap().len(), horizon as usize);
    } else {
        assert_matches!(
            result,
            Err(ForecastError::InvalidHorizon { requested, max: 90 }) if requested == horizon
        );
    }
}

#[rstest]
fn fit_needs_exactly_min_observations(
    #[values(
        ModelOrder::new(1, 1, 1),
        ModelOrder::new(2, 1, 0),
        ModelOrder::new(1, 0, 1),
        ModelOrder::new(0, 1, 1),
        ModelOrder::new(1, 0, 0),
        ModelOrder::new(1, 1, 0),
        ModelOrder::new(2, 1, 2)
    )]
    order: ModelOrder,
    #[values(
        [10.0, 12.0, 11.0, 13.0, 12.0, 14.0],
        [5.0, 0.0, 9.0, 1.0, 7.0, 3.0],
        [120.0, 80.0, 160.0, 40.0, 200.0, 10.0],
        [1.0, 2.0, 4.0, 8.0, 16.0, 32.0]
    )]
    pattern: [f64; 6],
) {
    let engine = ForecastEngine::new(ForecastSettings {
        model_order: order,
        ..Default::default()
    });
    let min = order.min_observations();

    let short = daily("MILK-1L", date(2025, 1, 1), &pattern[..min - 1]);
    let series = engine.prepare_series(&short, "MILK-1L").unwrap();
    assert_matches!(
        engine.fit(&series),
        Err(ForecastError::InsufficientData { required, actual, .. })
            if required == min && actual == min - 1
    );

    let exact = daily("MILK-1L", date(2025, 1, 1), &pattern[..min]);
    let series = engine.prepare_series(&exact, "MILK-1L").unwrap();
    let fitted = engine.fit(&series).expect("fit at minimum length");
    let points = engine.predict(&fitted, 7).unwrap();
    assert_eq!(points.len(), 7);
    assert!(points.iter().all(|p| p.predicted_quantity >= 0.0));
}

#[rstest]
#[case(ModelKind::Arima)]
#[case(ModelKind::Additive)]
fn flat_series_gives_flat_forecast(#[case] model: ModelKind) {
    let engine = ForecastEngine::new(ForecastSettings {
        model,
        ..Default::default()
    });
    let observations = daily("MILK-1L", date(2025, 1, 1), &[100.0; 30]);
    let series = engine.prepare_series(&observations, "MILK-1L").unwrap();
    let fitted = engine.fit(&series).unwrap();
    let points = engine.predict(&fitted, 5).unwrap();

    assert_eq!(points.len(), 5);
    assert_eq!(points[0].date, date(2025, 1, 31));
    for point in &points {
        assert!((point.predicted_quantity - 100.0).abs() < 1e-3);
        assert!(point.lower_bound >= 0.0);
        assert!(point.lower_bound <= point.predicted_quantity);
        assert!(point.upper_bound >= point.predicted_quantity);
    }
}

#[test]
fn trend_is_continued_by_default_arima() {
    let values: Vec<f64> = (0..40).map(|i| 50.0 + 2.0 * i as f64).collect();
    let outcome = engine()
        .forecast(&daily("CURD-500G", date(2025, 1, 1), &values), "CURD-500G", 3)
        .unwrap();
    assert!(!outcome.fallback_used);
    let predicted: Vec<f64> = outcome
        .predictions
        .iter()
        .map(|p| p.predicted_quantity)
        .collect();
    assert_eq!(predicted, vec![130.0, 132.0, 134.0]);
}

#[test]
fn falling_demand_is_floored_at_zero() {
    let values: Vec<f64> = (0..20).map(|i| 40.0 - 2.0 * i as f64).collect();
    let outcome = engine()
        .forecast(&daily("PANEER-200G", date(2025, 1, 1), &values), "PANEER-200G", 10)
        .unwrap();
    // Trend reaches zero on the first forecast day and keeps falling.
    assert!(outcome.predictions.iter().all(|p| p.predicted_quantity == 0.0));
    assert!(outcome.predictions.iter().all(|p| p.lower_bound == 0.0));
}

#[test]
fn degenerate_series_falls_back_and_is_flagged() {
    let outcome = engine()
        .forecast(&daily("MILK-1L", date(2025, 1, 1), &[0.0; 15]), "MILK-1L", 5)
        .unwrap();
    assert!(outcome.fallback_used);
    assert!(outcome.model.starts_with("naive"));
    assert_eq!(outcome.predictions.len(), 5);
}

#[test]
fn insufficient_data_is_surfaced_not_recovered() {
    let err = engine()
        .forecast(&daily("MILK-1L", date(2025, 1, 1), &[3.0, 4.0]), "MILK-1L", 5)
        .unwrap_err();
    assert_matches!(err, ForecastError::InsufficientData { required: 4, actual: 2, .. });
    assert!(err.user_message().contains("record more sales history"));
}
