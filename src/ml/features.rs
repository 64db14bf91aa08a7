use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;

use crate::models::{DailySalesPoint, TransactionSummary};

/// Day-of-week values treated as weekend (Monday = 0 .. Sunday = 6).
const WEEKEND_DAYS: [u8; 2] = [5, 6];

/// Day-of-month threshold past which a date counts as month end.
const MONTH_END_DAY: u8 = 25;

/// Rolling window length for the moving-average feature.
const ROLLING_WINDOW: usize = 7;

/// Transforms raw dated transactions into the engineered daily series
/// consumed by the demand model.
///
/// Pure transform: aggregation, calendar features, lag features, and a
/// trailing moving average. Days without sales are absent from the
/// series, not zero-filled.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    min_rows: usize,
}

impl FeatureBuilder {
    pub fn new(min_rows: usize) -> Self {
        Self { min_rows }
    }

    /// Aggregate transactions into one total per calendar day, ascending.
    pub fn daily_series(transactions: &[TransactionSummary]) -> Vec<(NaiveDate, f64)> {
        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for tx in transactions {
            let amount = tx.total_amount.to_f64().unwrap_or(0.0);
            *by_day.entry(tx.recorded_at.date_naive()).or_insert(0.0) += amount;
        }
        by_day.into_iter().collect()
    }

    /// Build the feature table.
    ///
    /// Returns an empty table when fewer than `min_rows` sale days exist
    /// in the window; that emptiness is what gates the learned model
    /// path. The first day of the series has no predecessor for `lag_1`
    /// and is dropped; `lag_7` falls back to `lag_1` until seven rows
    /// precede, and the moving average covers however many of the
    /// trailing seven rows exist.
    pub fn build(&self, transactions: &[TransactionSummary]) -> Vec<DailySalesPoint> {
        let series = Self::daily_series(transactions);
        if series.len() < self.min_rows {
            return Vec::new();
        }

        let totals: Vec<f64> = series.iter().map(|(_, total)| *total).collect();
        let mut points = Vec::with_capacity(series.len().saturating_sub(1));

        for (i, (date, total)) in series.iter().enumerate() {
            let lag_1 = match i {
                0 => continue,
                _ => totals[i - 1],
            };
            let lag_7 = if i >= ROLLING_WINDOW {
                totals[i - ROLLING_WINDOW]
            } else {
                lag_1
            };
            let window_start = i.saturating_sub(ROLLING_WINDOW - 1);
            let window = &totals[window_start..=i];
            let moving_avg_7 = window.iter().sum::<f64>() / window.len() as f64;

            let day_of_week = date.weekday().num_days_from_monday() as u8;
            let day_of_month = date.day() as u8;
            points.push(DailySalesPoint {
                date: *date,
                total_amount: *total,
                day_of_week,
                month: date.month() as u8,
                day_of_month,
                is_weekend: WEEKEND_DAYS.contains(&day_of_week),
                is_month_end: day_of_month > MONTH_END_DAY,
                lag_1,
                lag_7,
                moving_avg_7,
            });
        }

        points
    }
}

/// Calendar features plus iteratively updated lag features for one
/// future date, in the fixed 8-component order. `recent` is the
/// history-plus-predictions window, most recent last.
pub fn future_features(date: NaiveDate, recent: &[f64]) -> [f64; crate::models::sales::FEATURE_COUNT] {
    let last = recent.last().copied().unwrap_or(0.0);
    let lag_7 = if recent.len() >= ROLLING_WINDOW {
        recent[recent.len() - ROLLING_WINDOW]
    } else {
        last
    };
    let moving_avg_7 = if recent.len() >= ROLLING_WINDOW {
        let tail = &recent[recent.len() - ROLLING_WINDOW..];
        tail.iter().sum::<f64>() / tail.len() as f64
    } else {
        last
    };

    let day_of_week = date.weekday().num_days_from_monday() as u8;
    let day_of_month = date.day() as u8;
    [
        day_of_week as f64,
        date.month() as f64,
        day_of_month as f64,
        if WEEKEND_DAYS.contains(&day_of_week) { 1.0 } else { 0.0 },
        if day_of_month > MONTH_END_DAY { 1.0 } else { 0.0 },
        last,
        lag_7,
        moving_avg_7,
    ]
}

/// Whether the date falls on the statistical fallback's boosted days
/// (Friday, Saturday, Sunday).
pub fn is_boosted_day(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() >= 4
}
