use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::InsightConfig;
use crate::errors::EngineError;
use crate::models::{
    CustomerSegment, ForecastResult, Insight, InsightKind, InsightPriority, PriceRecommendation,
    ProductPerformance, ProductRecord, SalesSummary, StockoutPrediction, StoredInsight,
};
use crate::repositories::{InsightStore, TransactionRepository};

use super::analytics::SalesAnalyticsService;
use super::customers::CustomerSegmentationService;
use super::forecasting::DemandForecastService;
use super::inventory::InventoryOptimizationService;
use super::pricing::PriceOptimizationService;

/// Rule thresholds for the built-in checks.
const LOW_STOCK_THRESHOLD: i32 = 5;
const OVERSTOCK_STOCK: i32 = 50;
const STRONG_PERFORMANCE_DAILY: i64 = 2000;
const LOW_MARGIN_ALERT_PCT: f64 = 15.0;
const HIGH_MARGIN_OPPORTUNITY_PCT: f64 = 60.0;
const HIGH_VALUE_TRANSACTION: i64 = 500;
const LOYALTY_REPEAT_RATE: f64 = 1.5;
const SLOW_MOVER_UNITS: f64 = 2.0;
const STOCKOUT_RISK_DAYS: u32 = 7;

/// Everything the engine computes for one shop, assembled in one pass.
#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub forecast: Vec<ForecastResult>,
    pub stockouts: Vec<StockoutPrediction>,
    pub price_recommendations: Vec<PriceRecommendation>,
    pub segments: Vec<CustomerSegment>,
    pub insights: Vec<StoredInsight>,
    pub generated_at: DateTime<Utc>,
}

/// Insight aggregator: runs the analyzers and the rule-based checks for
/// a shop, merges their findings into one ranked, deduplicated list, and
/// replaces the shop's stored insight set atomically.
///
/// Every analyzer call runs under a wall-clock budget and degrades to
/// its default path on failure or timeout; the aggregator always
/// produces a complete result set.
pub struct InsightService {
    repo: Arc<dyn TransactionRepository>,
    store: Arc<dyn InsightStore>,
    analytics: Arc<SalesAnalyticsService>,
    forecaster: Arc<DemandForecastService>,
    inventory: Arc<InventoryOptimizationService>,
    pricing: Arc<PriceOptimizationService>,
    segmentation: Arc<CustomerSegmentationService>,
    config: InsightConfig,
}

impl InsightService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        store: Arc<dyn InsightStore>,
        analytics: Arc<SalesAnalyticsService>,
        forecaster: Arc<DemandForecastService>,
        inventory: Arc<InventoryOptimizationService>,
        pricing: Arc<PriceOptimizationService>,
        segmentation: Arc<CustomerSegmentationService>,
        config: InsightConfig,
    ) -> Self {
        Self {
            repo,
            store,
            analytics,
            forecaster,
            inventory,
            pricing,
            segmentation,
            config,
        }
    }

    /// Compute the shop's insight list without persisting it.
    #[instrument(skip(self))]
    pub async fn generate(&self, shop_id: Uuid) -> Result<Vec<Insight>, EngineError> {
        let summary = self
            .with_budget("sales summary", self.analytics.sales_summary(shop_id))
            .await;
        let products = self
            .with_budget("active products", self.repo.list_active_products(shop_id))
            .await
            .unwrap_or_default();
        let performance = self
            .with_budget(
                "product performance",
                self.analytics.product_performance(shop_id),
            )
            .await
            .unwrap_or_default();
        let stockouts = self
            .with_budget(
                "stockout forecast",
                self.inventory.stockout_forecast(shop_id),
            )
            .await
            .unwrap_or_default();
        let horizon = self.forecaster.default_horizon();
        let forecast = match self
            .with_budget("demand forecast", self.forecaster.predict(shop_id, horizon))
            .await
        {
            Some(forecast) => forecast,
            None => self.forecaster.default_forecast(horizon),
        };

        let mut insights = Vec::new();
        if let Some(summary) = &summary {
            insights.extend(self.sales_checks(summary));
            insights.extend(self.customer_checks(summary));
        }
        insights.extend(self.stock_checks(&products, &performance, &stockouts));
        insights.extend(self.margin_checks(&products));
        insights.extend(self.product_checks(&performance));
        insights.extend(self.forecast_check(&forecast));

        Ok(self.rank_and_bound(insights))
    }

    /// Regenerate and persist: the shop's previous insight set is
    /// replaced in one atomic store operation, so a concurrent reader
    /// never observes the cleared intermediate state.
    #[instrument(skip(self))]
    pub async fn regenerate(&self, shop_id: Uuid) -> Result<Vec<StoredInsight>, EngineError> {
        let insights = self.generate(shop_id).await?;
        info!(%shop_id, count = insights.len(), "replacing stored insights");
        self.store.replace_for_shop(shop_id, insights).await
    }

    pub async fn list(&self, shop_id: Uuid) -> Result<Vec<StoredInsight>, EngineError> {
        self.store.list_for_shop(shop_id).await
    }

    pub async fn mark_read(&self, insight_id: Uuid) -> Result<bool, EngineError> {
        self.store.mark_read(insight_id).await
    }

    /// Assemble the full analysis for one shop: forecast, stock-out
    /// projections, price recommendations, customer segments, and the
    /// regenerated insight list.
    #[instrument(skip(self))]
    pub async fn dashboard(&self, shop_id: Uuid) -> Result<DashboardReport, EngineError> {
        let insights = self.regenerate(shop_id).await?;
        let horizon = self.forecaster.default_horizon();
        let forecast = match self
            .with_budget("demand forecast", self.forecaster.predict(shop_id, horizon))
            .await
        {
            Some(forecast) => forecast,
            None => self.forecaster.default_forecast(horizon),
        };
        let stockouts = self
            .with_budget(
                "stockout forecast",
                self.inventory.stockout_forecast(shop_id),
            )
            .await
            .unwrap_or_default();
        let price_recommendations = self
            .with_budget(
                "price recommendations",
                self.pricing.recommendations(shop_id),
            )
            .await
            .unwrap_or_default();
        let segments = self
            .with_budget("customer segments", self.segmentation.segment(shop_id))
            .await
            .unwrap_or_default();

        Ok(DashboardReport {
            forecast,
            stockouts,
            price_recommendations,
            segments,
            insights,
            generated_at: Utc::now(),
        })
    }

    /// Run one analyzer under the configured wall-clock budget. Failures
    /// and timeouts degrade to None so the aggregation never aborts.
    async fn with_budget<T, F>(&self, label: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        let budget = Duration::from_secs(self.config.analyzer_budget_secs);
        match timeout(budget, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                warn!(analyzer = label, error = %err, "analyzer failed, degrading");
                None
            }
            Err(_) => {
                warn!(analyzer = label, budget_secs = self.config.analyzer_budget_secs, "analyzer timed out, degrading");
                None
            }
        }
    }

    fn sales_checks(&self, summary: &SalesSummary) -> Vec<Insight> {
        let mut insights = Vec::new();
        if summary.total_30d <= Decimal::ZERO {
            return insights;
        }

        let growth_factor = 1.0 + self.config.growth_threshold_pct / 100.0;
        let decline_factor = 1.0 - self.config.growth_threshold_pct / 100.0;
        let avg_30 = decimal_to_f64(summary.avg_daily_30d);
        let avg_7 = decimal_to_f64(summary.avg_daily_7d);

        if avg_30 > 0.0 && avg_7 > avg_30 * growth_factor {
            let change_pct = (avg_7 / avg_30 - 1.0) * 100.0;
            insights.push(Insight {
                kind: InsightKind::SalesGrowth { change_pct },
                title: "Sales Growth Detected".to_string(),
                message: format!(
                    "Your recent sales ({:.0}/day) are {:.1}% higher than your 30-day average. Great momentum!",
                    avg_7, change_pct
                ),
                priority: InsightPriority::High,
                confidence: 90,
            });
        } else if avg_30 > 0.0 && avg_7 < avg_30 * decline_factor {
            let change_pct = (1.0 - avg_7 / avg_30) * 100.0;
            insights.push(Insight {
                kind: InsightKind::SalesDecline { change_pct },
                title: "Sales Decline Alert".to_string(),
                message: format!(
                    "Recent sales ({:.0}/day) are down {:.1}%. Consider promotional campaigns.",
                    avg_7, change_pct
                ),
                priority: InsightPriority::Critical,
                confidence: 85,
            });
        }

        if summary.avg_daily_30d > Decimal::from(STRONG_PERFORMANCE_DAILY) {
            insights.push(Insight {
                kind: InsightKind::StrongPerformance {
                    avg_daily: summary.avg_daily_30d,
                },
                title: "Excellent Performance".to_string(),
                message: format!(
                    "Your daily average of {:.0} is above the {} benchmark. Consider expanding your product range.",
                    avg_30, STRONG_PERFORMANCE_DAILY
                ),
                priority: InsightPriority::Medium,
                confidence: 80,
            });
        }

        insights
    }

    fn stock_checks(
        &self,
        products: &[ProductRecord],
        performance: &[ProductPerformance],
        stockouts: &[StockoutPrediction],
    ) -> Vec<Insight> {
        let mut insights = Vec::new();

        let low_stock: Vec<&ProductRecord> = products
            .iter()
            .filter(|p| p.stock <= LOW_STOCK_THRESHOLD)
            .collect();
        if !low_stock.is_empty() {
            let names: Vec<String> = low_stock.iter().map(|p| p.name.clone()).collect();
            insights.push(Insight {
                kind: InsightKind::LowStock {
                    product_names: names.clone(),
                    count: low_stock.len(),
                },
                title: format!("{} Products Low on Stock", low_stock.len()),
                message: format!("Products running low: {}", self.name_list(&names)),
                priority: InsightPriority::Critical,
                confidence: 100,
            });
        }

        let sold_products: HashMap<Uuid, f64> = performance
            .iter()
            .map(|p| (p.product_id, p.units_sold))
            .collect();
        let overstocked: Vec<String> = products
            .iter()
            .filter(|p| {
                p.stock > OVERSTOCK_STOCK
                    && sold_products.get(&p.id).copied().unwrap_or(0.0) == 0.0
            })
            .map(|p| p.name.clone())
            .collect();
        if !overstocked.is_empty() {
            insights.push(Insight {
                kind: InsightKind::Overstock {
                    product_names: overstocked.clone(),
                    count: overstocked.len(),
                },
                title: "Overstock Alert".to_string(),
                message: format!(
                    "{} products hold high stock with no sales in 30 days: {}. Consider promotions or price reductions.",
                    overstocked.len(),
                    self.name_list(&overstocked)
                ),
                priority: InsightPriority::Medium,
                confidence: 90,
            });
        }

        let at_risk: Vec<&StockoutPrediction> = stockouts
            .iter()
            .filter(|p| p.days_until_stockout <= STOCKOUT_RISK_DAYS)
            .collect();
        if let Some(soonest) = at_risk.iter().map(|p| p.days_until_stockout).min() {
            let names: Vec<String> = at_risk.iter().map(|p| p.product_name.clone()).collect();
            insights.push(Insight {
                kind: InsightKind::StockoutRisk {
                    product_names: names.clone(),
                    soonest_days: soonest,
                },
                title: "Stock-Out Risk".to_string(),
                message: format!(
                    "{} products are projected to run out within {} days: {}",
                    names.len(),
                    STOCKOUT_RISK_DAYS,
                    self.name_list(&names)
                ),
                priority: InsightPriority::High,
                confidence: 70,
            });
        }

        insights
    }

    fn margin_checks(&self, products: &[ProductRecord]) -> Vec<Insight> {
        let mut insights = Vec::new();

        let low_margin: Vec<String> = products
            .iter()
            .filter(|p| matches!(p.margin_pct(), Some(m) if m < LOW_MARGIN_ALERT_PCT))
            .map(|p| p.name.clone())
            .collect();
        if !low_margin.is_empty() {
            insights.push(Insight {
                kind: InsightKind::LowMargin {
                    product_names: low_margin.clone(),
                    count: low_margin.len(),
                },
                title: "Low Margin Products Detected".to_string(),
                message: format!(
                    "{} products have margins below {:.0}%: {}. Consider price adjustments.",
                    low_margin.len(),
                    LOW_MARGIN_ALERT_PCT,
                    self.name_list(&low_margin)
                ),
                priority: InsightPriority::High,
                confidence: 95,
            });
        }

        let high_margin_count = products
            .iter()
            .filter(|p| matches!(p.margin_pct(), Some(m) if m > HIGH_MARGIN_OPPORTUNITY_PCT))
            .count();
        if high_margin_count > 0 {
            insights.push(Insight {
                kind: InsightKind::HighMargin {
                    count: high_margin_count,
                },
                title: "High Margin Products".to_string(),
                message: format!(
                    "{} products have excellent margins (>{:.0}%). Great pricing strategy!",
                    high_margin_count, HIGH_MARGIN_OPPORTUNITY_PCT
                ),
                priority: InsightPriority::Low,
                confidence: 80,
            });
        }

        insights
    }

    fn customer_checks(&self, summary: &SalesSummary) -> Vec<Insight> {
        let mut insights = Vec::new();

        if summary.avg_transaction > Decimal::from(HIGH_VALUE_TRANSACTION) {
            insights.push(Insight {
                kind: InsightKind::HighCustomerValue {
                    avg_transaction: summary.avg_transaction,
                },
                title: "High-Value Customers".to_string(),
                message: format!(
                    "Your average transaction value is {:.0}, above the {} benchmark. Focus on customer retention strategies.",
                    decimal_to_f64(summary.avg_transaction),
                    HIGH_VALUE_TRANSACTION
                ),
                priority: InsightPriority::Medium,
                confidence: 80,
            });
        }

        if summary.distinct_customers > 0 && summary.repeat_rate > LOYALTY_REPEAT_RATE {
            insights.push(Insight {
                kind: InsightKind::CustomerLoyalty {
                    repeat_rate: summary.repeat_rate,
                },
                title: "Strong Customer Loyalty".to_string(),
                message: format!(
                    "Customers are making {:.1} repeat purchases on average. Excellent retention!",
                    summary.repeat_rate
                ),
                priority: InsightPriority::Low,
                confidence: 85,
            });
        }

        insights
    }

    fn product_checks(&self, performance: &[ProductPerformance]) -> Vec<Insight> {
        let mut insights = Vec::new();

        if let Some(top) = performance.iter().find(|p| p.units_sold > 0.0) {
            insights.push(Insight {
                kind: InsightKind::TopProduct {
                    name: top.product_name.clone(),
                    units_sold: top.units_sold,
                    revenue: top.revenue,
                },
                title: "Top Performing Product".to_string(),
                message: format!(
                    "{} is your star performer with {:.0} units sold ({:.0} revenue).",
                    top.product_name,
                    top.units_sold,
                    decimal_to_f64(top.revenue)
                ),
                priority: InsightPriority::Medium,
                confidence: 90,
            });
        }

        let slow_movers = performance
            .iter()
            .filter(|p| p.units_sold > 0.0 && p.units_sold <= SLOW_MOVER_UNITS)
            .count();
        if slow_movers > 0 {
            insights.push(Insight {
                kind: InsightKind::SlowMovers { count: slow_movers },
                title: "Slow Moving Products".to_string(),
                message: format!(
                    "{} products have very low sales. Consider bundling or promotional offers.",
                    slow_movers
                ),
                priority: InsightPriority::Medium,
                confidence: 80,
            });
        }

        insights
    }

    fn forecast_check(&self, forecast: &[ForecastResult]) -> Vec<Insight> {
        let Some(first) = forecast.first() else {
            return Vec::new();
        };
        let total: Decimal = forecast.iter().map(|f| f.predicted_amount).sum();
        vec![Insight {
            kind: InsightKind::SalesForecast {
                next_7_day_total: total,
            },
            title: "Weekly Sales Outlook".to_string(),
            message: format!(
                "Projected sales for the next {} days: {:.0}.",
                forecast.len(),
                decimal_to_f64(total)
            ),
            priority: InsightPriority::Medium,
            confidence: first.confidence,
        }]
    }

    /// Rank by priority then confidence, dropping duplicates past the
    /// per-kind bound.
    fn rank_and_bound(&self, mut insights: Vec<Insight>) -> Vec<Insight> {
        insights.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.confidence.cmp(&a.confidence))
        });
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        insights
            .into_iter()
            .filter(|insight| {
                let seen = counts.entry(insight.kind.key()).or_insert(0);
                *seen += 1;
                *seen <= self.config.max_per_kind
            })
            .collect()
    }

    /// Bounded comma list of product names, with an ellipsis past the cap.
    fn name_list(&self, names: &[String]) -> String {
        let cap = self.config.names_per_message;
        let shown = names
            .iter()
            .take(cap)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if names.len() > cap {
            format!("{}...", shown)
        } else {
            shown
        }
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    value.to_f64().unwrap_or(0.0)
}
