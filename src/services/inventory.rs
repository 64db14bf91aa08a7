use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::Statistics;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::InventoryConfig;
use crate::errors::EngineError;
use crate::models::{DerivationMethod, InventoryProfile, ProductRecord, StockoutPrediction};
use crate::repositories::TransactionRepository;

/// Window for the sales velocity behind stock-out projections, in days.
const STOCKOUT_VELOCITY_DAYS: i64 = 30;

/// Reorder covers this many days of demand when no cost data permits an
/// EOQ calculation.
const SUPPLY_DAYS_HEURISTIC: f64 = 30.0;

/// Safety stock spans two standard deviations of daily demand.
const SAFETY_STOCK_SIGMA: f64 = 2.0;

/// Inventory optimizer: reorder point, safety stock, and economic order
/// quantity per product from trailing sales-velocity statistics, plus
/// shop-wide stock-out projections.
pub struct InventoryOptimizationService {
    repo: Arc<dyn TransactionRepository>,
    config: InventoryConfig,
}

impl InventoryOptimizationService {
    pub fn new(repo: Arc<dyn TransactionRepository>, config: InventoryConfig) -> Self {
        Self { repo, config }
    }

    /// Compute a stocking profile for one product. Falls back to a fixed
    /// default profile when fewer sale days exist than the statistics
    /// need.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn optimize(&self, product: &ProductRecord) -> Result<InventoryProfile, EngineError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(self.config.lookback_days);
        let items = self
            .repo
            .list_line_items_for_product(product.id, from, today)
            .await?;

        let daily = daily_quantities(&items);
        if daily.len() < self.config.min_history_days {
            debug!(days = daily.len(), "insufficient sale days, default profile");
            return Ok(self.default_profile(product));
        }

        let quantities: Vec<f64> = daily.values().copied().collect();
        let mean_daily = quantities.as_slice().mean();
        let std_daily = quantities.as_slice().std_dev();
        let lead_time = f64::from(self.config.lead_time_days);

        let safety_stock = SAFETY_STOCK_SIGMA * std_daily * lead_time.sqrt();
        let reorder_point = mean_daily * lead_time + safety_stock;

        let annual_demand = mean_daily * 365.0;
        let cost = product.cost_price.and_then(|c| c.to_f64()).unwrap_or(0.0);
        let eoq = if cost > 0.0 {
            let holding_cost = cost * self.config.holding_cost_rate;
            (2.0 * annual_demand * self.config.ordering_cost / holding_cost).sqrt()
        } else {
            mean_daily * SUPPLY_DAYS_HEURISTIC
        };

        Ok(InventoryProfile {
            product_id: product.id,
            reorder_point: floor_at_one(reorder_point),
            optimal_order_quantity: floor_at_one(eoq),
            safety_stock: floor_at_one(safety_stock),
            daily_demand_estimate: (mean_daily * 100.0).round() / 100.0,
            confidence: velocity_confidence(daily.len()),
            method: DerivationMethod::Statistical,
        })
    }

    /// Project stock-outs across a shop's active products from trailing
    /// sales velocity, soonest first.
    #[instrument(skip(self))]
    pub async fn stockout_forecast(
        &self,
        shop_id: Uuid,
    ) -> Result<Vec<StockoutPrediction>, EngineError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(STOCKOUT_VELOCITY_DAYS);
        let products = self.repo.list_active_products(shop_id).await?;

        let mut predictions = Vec::new();
        for product in products.iter().filter(|p| p.stock > 0) {
            let items = self
                .repo
                .list_line_items_for_product(product.id, from, today)
                .await?;
            let total_sold: f64 = items
                .iter()
                .map(|i| i.quantity.to_f64().unwrap_or(0.0))
                .sum();
            let daily_rate = total_sold / STOCKOUT_VELOCITY_DAYS as f64;
            if daily_rate <= 0.0 {
                continue;
            }

            let days_left = (product.stock as f64 / daily_rate).floor() as u32;
            predictions.push(StockoutPrediction {
                product_id: product.id,
                product_name: product.name.clone(),
                current_stock: product.stock,
                daily_sales_rate: (daily_rate * 10.0).round() / 10.0,
                days_until_stockout: days_left,
                recommended_reorder_quantity: ((daily_rate * 14.0).ceil() as u32).max(20),
                confidence: 70,
            });
        }

        predictions.sort_by_key(|p| p.days_until_stockout);
        predictions.truncate(self.config.stockout_limit);
        Ok(predictions)
    }

    fn default_profile(&self, product: &ProductRecord) -> InventoryProfile {
        InventoryProfile {
            product_id: product.id,
            reorder_point: product.min_stock_alert.max(5) as u32,
            optimal_order_quantity: 20,
            safety_stock: 5,
            daily_demand_estimate: 1.0,
            confidence: 30,
            method: DerivationMethod::Default,
        }
    }
}

fn daily_quantities(items: &[crate::models::SaleLineItem]) -> BTreeMap<NaiveDate, f64> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for item in items {
        *daily.entry(item.recorded_at.date_naive()).or_insert(0.0) +=
            item.quantity.to_f64().unwrap_or(0.0);
    }
    daily
}

fn floor_at_one(value: f64) -> u32 {
    (value as u32).max(1)
}

/// Confidence scales with how many sale days back the statistics.
fn velocity_confidence(data_points: usize) -> u8 {
    if data_points >= 30 {
        90
    } else if data_points >= 14 {
        75
    } else if data_points >= 7 {
        60
    } else {
        40
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bands_follow_data_point_count() {
        assert_eq!(velocity_confidence(45), 90);
        assert_eq!(velocity_confidence(30), 90);
        assert_eq!(velocity_confidence(14), 75);
        assert_eq!(velocity_confidence(7), 60);
        assert_eq!(velocity_confidence(6), 40);
    }

    #[test]
    fn outputs_floor_at_one() {
        assert_eq!(floor_at_one(0.0), 1);
        assert_eq!(floor_at_one(0.9), 1);
        assert_eq!(floor_at_one(7.8), 7);
    }
}
