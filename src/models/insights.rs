use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Insight urgency, ordered lowest to highest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InsightPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Closed set of insight kinds, each variant carrying only the data it
/// needs. Serialized internally tagged so consumers can branch without
/// inspecting optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsightKind {
    /// Recent daily average above the 30-day baseline
    SalesGrowth { change_pct: f64 },
    /// Recent daily average below the 30-day baseline
    SalesDecline { change_pct: f64 },
    /// Daily average clears the strong-performance benchmark
    StrongPerformance { avg_daily: Decimal },
    /// Active products at or below the low-stock threshold
    LowStock {
        product_names: Vec<String>,
        count: usize,
    },
    /// High stock with zero sales over the trailing month
    Overstock {
        product_names: Vec<String>,
        count: usize,
    },
    /// Products projected to run out within the lead time
    StockoutRisk {
        product_names: Vec<String>,
        soonest_days: u32,
    },
    /// Products with margin below the alert floor
    LowMargin {
        product_names: Vec<String>,
        count: usize,
    },
    /// Products with margin above the opportunity ceiling
    HighMargin { count: usize },
    /// Average transaction value clears the high-value benchmark
    HighCustomerValue { avg_transaction: Decimal },
    /// Repeat-purchase rate clears the loyalty benchmark
    CustomerLoyalty { repeat_rate: f64 },
    /// Best-selling product over the trailing month
    TopProduct {
        name: String,
        units_sold: f64,
        revenue: Decimal,
    },
    /// Products with very low trailing sales
    SlowMovers { count: usize },
    /// Aggregate demand forecast for the coming week
    SalesForecast { next_7_day_total: Decimal },
}

impl InsightKind {
    /// Stable discriminant used for deduplication and per-kind bounding.
    pub fn key(&self) -> &'static str {
        match self {
            InsightKind::SalesGrowth { .. } => "sales_growth",
            InsightKind::SalesDecline { .. } => "sales_decline",
            InsightKind::StrongPerformance { .. } => "strong_performance",
            InsightKind::LowStock { .. } => "low_stock",
            InsightKind::Overstock { .. } => "overstock",
            InsightKind::StockoutRisk { .. } => "stockout_risk",
            InsightKind::LowMargin { .. } => "low_margin",
            InsightKind::HighMargin { .. } => "high_margin",
            InsightKind::HighCustomerValue { .. } => "high_customer_value",
            InsightKind::CustomerLoyalty { .. } => "customer_loyalty",
            InsightKind::TopProduct { .. } => "top_product",
            InsightKind::SlowMovers { .. } => "slow_movers",
            InsightKind::SalesForecast { .. } => "sales_forecast",
        }
    }
}

/// One actionable insight produced by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    pub priority: InsightPriority,
    /// 0-100
    pub confidence: u8,
}

/// Persisted envelope around an insight, shop-scoped with a mutable
/// read flag. Superseded wholesale on each regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredInsight {
    pub id: Uuid,
    pub shop_id: Uuid,
    #[serde(flatten)]
    pub insight: Insight,
    pub is_read: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn priorities_order_low_to_critical() {
        assert!(InsightPriority::Low < InsightPriority::Medium);
        assert!(InsightPriority::Medium < InsightPriority::High);
        assert!(InsightPriority::High < InsightPriority::Critical);
    }

    #[test]
    fn kind_serializes_internally_tagged() {
        let kind = InsightKind::SalesForecast {
            next_7_day_total: dec!(8400.00),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "sales_forecast");
        assert_eq!(json["next_7_day_total"], "8400.00");
    }

    #[test]
    fn kind_keys_are_stable() {
        let kind = InsightKind::LowStock {
            product_names: vec!["Tea".into()],
            count: 1,
        };
        assert_eq!(kind.key(), "low_stock");
    }
}
