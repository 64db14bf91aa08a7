use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DerivationMethod;

/// Product master record as read from the inventory collaborator.
///
/// Stock itself is owned by the external inventory system; the engine
/// only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub stock: i32,
    pub cost_price: Option<Decimal>,
    pub sale_price: Decimal,
    pub min_stock_alert: i32,
    pub is_active: bool,
}

impl ProductRecord {
    /// Gross margin as a percentage of sale price, when cost is known
    /// and the sale price is positive.
    pub fn margin_pct(&self) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        let cost = self.cost_price?.to_f64()?;
        let price = self.sale_price.to_f64()?;
        if price <= 0.0 {
            return None;
        }
        Some((price - cost) / price * 100.0)
    }
}

/// Recomputed-on-demand stocking recommendation for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryProfile {
    pub product_id: Uuid,
    pub reorder_point: u32,
    pub optimal_order_quantity: u32,
    pub safety_stock: u32,
    pub daily_demand_estimate: f64,
    /// 0-100
    pub confidence: u8,
    pub method: DerivationMethod,
}

/// Projected stock-out for one product, from trailing sales velocity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockoutPrediction {
    pub product_id: Uuid,
    pub product_name: String,
    pub current_stock: i32,
    pub daily_sales_rate: f64,
    pub days_until_stockout: u32,
    pub recommended_reorder_quantity: u32,
    /// 0-100
    pub confidence: u8,
}
