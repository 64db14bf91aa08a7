use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::DerivationMethod;

/// Enumerated rationale behind a price recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PriceRationale {
    /// Elasticity below -1: lowering price increases revenue
    #[strum(serialize = "Elastic demand - lower price increases revenue")]
    ElasticDemand,
    /// Elasticity above -0.5: demand tolerates a higher price
    #[strum(serialize = "Inelastic demand - can increase price")]
    InelasticDemand,
    /// Elasticity between -1 and -0.5
    #[strum(serialize = "Current price is optimal")]
    OptimalPrice,
    /// Margin below 20 percent
    #[strum(serialize = "Low margin - increase price")]
    LowMargin,
    /// Margin above 50 percent
    #[strum(serialize = "High margin - competitive pricing")]
    HighMargin,
    /// Margin between 20 and 50 percent
    #[strum(serialize = "Healthy margin maintained")]
    HealthyMargin,
    /// No cost data on record
    #[strum(serialize = "Insufficient cost data")]
    MissingCostData,
}

/// Price recommendation for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecommendation {
    pub product_id: Uuid,
    pub current_price: Decimal,
    pub recommended_price: Decimal,
    /// Log-log regression slope; typically negative. The heuristic path
    /// reports -1.0.
    pub elasticity: f64,
    pub reason: PriceRationale,
    /// 0-100
    pub confidence: u8,
    /// Recommended change relative to the current price, percent
    pub expected_change_pct: f64,
    pub method: DerivationMethod,
}

impl PriceRecommendation {
    /// Whether acting on the recommendation would change the price.
    pub fn is_actionable(&self) -> bool {
        self.expected_change_pct != 0.0
    }
}
