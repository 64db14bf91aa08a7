use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{ProductPerformance, SalesSummary};
use crate::repositories::TransactionRepository;

/// Trailing windows used by the rollups, in days.
const BASELINE_WINDOW_DAYS: i64 = 30;
const RECENT_WINDOW_DAYS: i64 = 7;

/// Read-side sales rollups feeding the rule-based insight checks: no
/// modeling, just trailing-window aggregation.
pub struct SalesAnalyticsService {
    repo: Arc<dyn TransactionRepository>,
}

impl SalesAnalyticsService {
    pub fn new(repo: Arc<dyn TransactionRepository>) -> Self {
        Self { repo }
    }

    /// Trailing 30/7-day sales and customer rollup for one shop.
    #[instrument(skip(self))]
    pub async fn sales_summary(&self, shop_id: Uuid) -> Result<SalesSummary, EngineError> {
        let today = Utc::now().date_naive();
        let baseline_start = today - Duration::days(BASELINE_WINDOW_DAYS);
        let recent_start = today - Duration::days(RECENT_WINDOW_DAYS);

        let transactions = self
            .repo
            .list_transactions(shop_id, baseline_start, today)
            .await?;

        let total_30d: Decimal = transactions.iter().map(|t| t.total_amount).sum();
        let total_7d: Decimal = transactions
            .iter()
            .filter(|t| t.recorded_at.date_naive() >= recent_start)
            .map(|t| t.total_amount)
            .sum();

        let transactions_30d = transactions.len() as u64;
        let avg_transaction = if transactions_30d > 0 {
            (total_30d / Decimal::from(transactions_30d)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let mut visits: HashMap<&str, u64> = HashMap::new();
        for tx in &transactions {
            if let Some(name) = tx.customer_name.as_deref().filter(|n| !n.is_empty()) {
                *visits.entry(name).or_insert(0) += 1;
            }
        }
        let distinct_customers = visits.len() as u64;
        let repeat_customers = visits.values().filter(|v| **v > 1).count() as u64;
        let repeat_rate = if distinct_customers > 0 {
            (transactions_30d.saturating_sub(distinct_customers)) as f64
                / distinct_customers as f64
        } else {
            0.0
        };

        Ok(SalesSummary {
            total_30d,
            total_7d,
            avg_daily_30d: (total_30d / Decimal::from(BASELINE_WINDOW_DAYS)).round_dp(2),
            avg_daily_7d: (total_7d / Decimal::from(RECENT_WINDOW_DAYS)).round_dp(2),
            avg_transaction,
            transactions_30d,
            distinct_customers,
            repeat_customers,
            repeat_rate,
        })
    }

    /// Per-product units and revenue over the trailing month, best
    /// sellers first.
    #[instrument(skip(self))]
    pub async fn product_performance(
        &self,
        shop_id: Uuid,
    ) -> Result<Vec<ProductPerformance>, EngineError> {
        use rust_decimal::prelude::ToPrimitive;

        let today = Utc::now().date_naive();
        let from = today - Duration::days(BASELINE_WINDOW_DAYS);
        let items = self
            .repo
            .list_line_items_for_shop(shop_id, from, today)
            .await?;

        let mut by_product: HashMap<Uuid, ProductPerformance> = HashMap::new();
        for item in items {
            let entry = by_product
                .entry(item.product_id)
                .or_insert_with(|| ProductPerformance {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    units_sold: 0.0,
                    revenue: Decimal::ZERO,
                });
            entry.units_sold += item.quantity.to_f64().unwrap_or(0.0);
            entry.revenue += item.quantity * item.unit_price;
        }

        let mut performance: Vec<ProductPerformance> = by_product.into_values().collect();
        performance.sort_by(|a, b| {
            b.units_sold
                .partial_cmp(&a.units_sold)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });
        Ok(performance)
    }

    /// Daily revenue series for display: absent days render as zero.
    #[instrument(skip(self))]
    pub async fn daily_trend(
        &self,
        shop_id: Uuid,
        days: i64,
    ) -> Result<Vec<(NaiveDate, Decimal)>, EngineError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(days);
        let transactions = self.repo.list_transactions(shop_id, from, today).await?;

        let mut by_day: HashMap<NaiveDate, Decimal> = HashMap::new();
        for tx in transactions {
            *by_day
                .entry(tx.recorded_at.date_naive())
                .or_insert(Decimal::ZERO) += tx.total_amount;
        }

        Ok((0..=days)
            .map(|offset| {
                let date = from + Duration::days(offset);
                (date, by_day.get(&date).copied().unwrap_or(Decimal::ZERO))
            })
            .collect())
    }
}
