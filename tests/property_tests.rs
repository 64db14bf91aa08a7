//! Property-based tests for the engine's core invariants.
//!
//! These use proptest to verify the feature-vector contract and the
//! model-math guardrails across a wide range of generated histories.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shoplytics::ml::features::{future_features, FeatureBuilder};
use shoplytics::ml::forest::{ForestConfig, RandomForestRegressor};
use shoplytics::ml::scaler::StandardScaler;
use shoplytics::models::sales::FEATURE_COUNT;
use shoplytics::models::TransactionSummary;

fn history_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
    // (day offset into a 90-day window, bill total)
    prop::collection::vec((0i64..90, 0i64..100_000), 0..120)
}

fn window_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..50_000.0, 0..40)
}

fn transactions(history: &[(i64, i64)]) -> Vec<TransactionSummary> {
    let shop_id = Uuid::new_v4();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    history
        .iter()
        .map(|(offset, amount)| TransactionSummary {
            id: Uuid::new_v4(),
            shop_id,
            recorded_at: base + Duration::days(*offset),
            total_amount: Decimal::from(*amount),
            customer_name: None,
        })
        .collect()
}

proptest! {
    // Every engineered row carries exactly the fixed-order eight
    // features, all finite, regardless of input history shape.
    #[test]
    fn feature_rows_always_have_eight_finite_components(history in history_strategy()) {
        let points = FeatureBuilder::new(10).build(&transactions(&history));
        for point in &points {
            let features = point.features();
            prop_assert_eq!(features.len(), FEATURE_COUNT);
            prop_assert!(features.iter().all(|f| f.is_finite()));
        }
    }

    // The feature table is ordered and its lag_1 column links rows.
    #[test]
    fn feature_rows_are_ordered_and_lag_linked(history in history_strategy()) {
        let points = FeatureBuilder::new(10).build(&transactions(&history));
        for pair in points.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
            prop_assert_eq!(pair[1].lag_1, pair[0].total_amount);
        }
    }

    // Future-day vectors obey the same contract for any rolling window.
    #[test]
    fn future_vectors_always_have_eight_finite_components(
        window in window_strategy(),
        day_offset in 0i64..365,
    ) {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day_offset);
        let features = future_features(date, &window);
        prop_assert_eq!(features.len(), FEATURE_COUNT);
        prop_assert!(features.iter().all(|f| f.is_finite()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Ensemble predictions interpolate: they never leave the range of
    // the training targets, so clamped forecasts stay non-negative for
    // non-negative sales history.
    #[test]
    fn forest_predictions_stay_within_target_range(
        targets in prop::collection::vec(0.0f64..10_000.0, 12..40),
        probe in prop::collection::vec(0.0f64..100.0, 3),
    ) {
        let rows: Vec<Vec<f64>> = (0..targets.len())
            .map(|i| vec![(i % 7) as f64, ((i * 13) % 90) as f64, (i % 28) as f64])
            .collect();
        let forest = RandomForestRegressor::fit(
            ForestConfig { tree_count: 15, ..ForestConfig::default() },
            &rows,
            &targets,
        ).unwrap();

        let lo = targets.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = targets.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let prediction = forest.predict(&probe).unwrap();
        prop_assert!(prediction >= lo - 1e-9 && prediction <= hi + 1e-9);
    }

    // Vectors of the wrong width are rejected before prediction.
    #[test]
    fn forest_rejects_wrong_width_vectors(width in 0usize..12) {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| {
            (0..FEATURE_COUNT).map(|j| ((i + j) % 9) as f64).collect()
        }).collect();
        let targets: Vec<f64> = (0..20).map(|i| i as f64 * 10.0).collect();
        let forest = RandomForestRegressor::fit(
            ForestConfig { tree_count: 5, ..ForestConfig::default() },
            &rows,
            &targets,
        ).unwrap();

        let probe = vec![1.0; width];
        if width == FEATURE_COUNT {
            prop_assert!(forest.predict(&probe).is_ok());
        } else {
            prop_assert!(forest.predict(&probe).is_err());
        }
    }

    // Standardization round-trips through serde without drift.
    #[test]
    fn scaler_round_trips_through_serde(
        rows in prop::collection::vec(
            prop::collection::vec(-1_000.0f64..1_000.0, FEATURE_COUNT..=FEATURE_COUNT),
            2..30,
        ),
    ) {
        let scaler = StandardScaler::fit(&rows).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let restored: StandardScaler = serde_json::from_str(&json).unwrap();
        for row in &rows {
            prop_assert_eq!(scaler.transform(row).unwrap(), restored.transform(row).unwrap());
        }
    }
}
