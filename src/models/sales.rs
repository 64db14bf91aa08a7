use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Number of numeric components in the feature vector contract between
/// the feature builder and the demand model. A vector of any other length
/// is rejected before prediction.
pub const FEATURE_COUNT: usize = 8;

/// One sales transaction (bill) as read from the transaction repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub total_amount: Decimal,
    /// Proxy customer identity; empty names are treated as anonymous
    pub customer_name: Option<String>,
}

/// One sale line item as read from the transaction repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub recorded_at: DateTime<Utc>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// One complete row of the engineered daily time series.
///
/// The feature builder drops any day whose lag or rolling inputs are
/// unavailable, so a constructed point always carries all eight features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySalesPoint {
    pub date: NaiveDate,
    /// Summed sale totals for the calendar day
    pub total_amount: f64,
    /// Monday = 0 .. Sunday = 6
    pub day_of_week: u8,
    pub month: u8,
    pub day_of_month: u8,
    /// Saturday or Sunday
    pub is_weekend: bool,
    /// Day of month past the 25th
    pub is_month_end: bool,
    /// Previous row's total
    pub lag_1: f64,
    /// Total seven rows back in the sorted feature table
    pub lag_7: f64,
    /// Mean of the trailing seven rows, inclusive
    pub moving_avg_7: f64,
}

impl DailySalesPoint {
    /// The fixed-order feature vector fed to the demand model.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.day_of_week as f64,
            self.month as f64,
            self.day_of_month as f64,
            if self.is_weekend { 1.0 } else { 0.0 },
            if self.is_month_end { 1.0 } else { 0.0 },
            self.lag_1,
            self.lag_7,
            self.moving_avg_7,
        ]
    }
}

/// How a forecast entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ForecastMethod {
    Ml,
    Statistical,
}

/// Predicted daily sales for one future date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub date: NaiveDate,
    pub predicted_amount: Decimal,
    /// 0-100
    pub confidence: u8,
    pub method: ForecastMethod,
}

/// Trailing-window sales rollup feeding the rule-based insight checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_30d: Decimal,
    pub total_7d: Decimal,
    pub avg_daily_30d: Decimal,
    pub avg_daily_7d: Decimal,
    pub avg_transaction: Decimal,
    pub transactions_30d: u64,
    pub distinct_customers: u64,
    pub repeat_customers: u64,
    /// Average repeat purchases per distinct customer
    pub repeat_rate: f64,
}

/// Per-product sales totals over a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPerformance {
    pub product_id: Uuid,
    pub product_name: String,
    pub units_sold: f64,
    pub revenue: Decimal,
}
