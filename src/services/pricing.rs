use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::errors::EngineError;
use crate::ml::regression::log_log_elasticity;
use crate::models::{DerivationMethod, PriceRationale, PriceRecommendation, ProductRecord};
use crate::repositories::TransactionRepository;

/// Elasticity below this is elastic demand: a small cut grows revenue.
const ELASTIC_THRESHOLD: f64 = -1.0;

/// Elasticity above this is inelastic demand: price tolerates a raise.
const INELASTIC_THRESHOLD: f64 = -0.5;

/// Margin bounds for the heuristic path, percent.
const LOW_MARGIN_PCT: f64 = 20.0;
const HIGH_MARGIN_PCT: f64 = 50.0;

/// Confidence when the elasticity regression succeeds / when the margin
/// heuristic answers instead.
const REGRESSION_CONFIDENCE: u8 = 75;
const HEURISTIC_CONFIDENCE: u8 = 50;

/// Price analyzer: estimates demand elasticity per product from observed
/// (price, quantity) pairs and derives a recommended price bounded by a
/// minimum-margin constraint, degrading to a margin heuristic on thin or
/// degenerate data.
pub struct PriceOptimizationService {
    repo: Arc<dyn TransactionRepository>,
    config: PricingConfig,
}

impl PriceOptimizationService {
    pub fn new(repo: Arc<dyn TransactionRepository>, config: PricingConfig) -> Self {
        Self { repo, config }
    }

    /// Recommend a price for one product. Never errors on data quality:
    /// the heuristic path answers whenever the regression cannot.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn analyze(
        &self,
        product: &ProductRecord,
    ) -> Result<PriceRecommendation, EngineError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(self.config.lookback_days);
        let items = self
            .repo
            .list_line_items_for_product(product.id, from, today)
            .await?;

        if items.len() < self.config.min_line_items {
            debug!(items = items.len(), "too few line items, margin heuristic");
            return Ok(self.margin_heuristic(product));
        }

        // demand observed at each distinct price point
        let mut demand_by_price: BTreeMap<Decimal, f64> = BTreeMap::new();
        for item in &items {
            *demand_by_price.entry(item.unit_price).or_insert(0.0) +=
                item.quantity.to_f64().unwrap_or(0.0);
        }
        if demand_by_price.len() < self.config.min_price_points {
            debug!(
                price_points = demand_by_price.len(),
                "single observed price, margin heuristic"
            );
            return Ok(self.margin_heuristic(product));
        }

        let prices: Vec<f64> = demand_by_price
            .keys()
            .map(|p| p.to_f64().unwrap_or(0.0))
            .collect();
        let quantities: Vec<f64> = demand_by_price.values().copied().collect();

        let elasticity = match log_log_elasticity(&prices, &quantities) {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "elasticity fit failed, margin heuristic");
                return Ok(self.margin_heuristic(product));
            }
        };

        let current = product.sale_price;
        let (raw_recommendation, reason) = if elasticity < ELASTIC_THRESHOLD {
            (current * dec!(0.95), PriceRationale::ElasticDemand)
        } else if elasticity > INELASTIC_THRESHOLD {
            (current * dec!(1.10), PriceRationale::InelasticDemand)
        } else {
            (current, PriceRationale::OptimalPrice)
        };

        let recommended = self.apply_price_floor(product, raw_recommendation);
        Ok(PriceRecommendation {
            product_id: product.id,
            current_price: current,
            recommended_price: recommended.round_dp(2),
            elasticity: (elasticity * 100.0).round() / 100.0,
            reason,
            confidence: REGRESSION_CONFIDENCE,
            expected_change_pct: change_pct(current, recommended),
            method: DerivationMethod::Learned,
        })
    }

    /// Price recommendations across a shop's catalog: analyze a bounded
    /// slice of active products, keep actionable changes only.
    #[instrument(skip(self))]
    pub async fn recommendations(
        &self,
        shop_id: Uuid,
    ) -> Result<Vec<PriceRecommendation>, EngineError> {
        let products = self.repo.list_active_products(shop_id).await?;
        let mut recommendations = Vec::new();
        for product in products.iter().take(self.config.products_per_run) {
            let recommendation = self.analyze(product).await?;
            if recommendation.is_actionable() {
                recommendations.push(recommendation);
            }
        }
        recommendations.truncate(self.config.recommendation_limit);
        Ok(recommendations)
    }

    /// Margin-based default path when elasticity cannot be estimated.
    fn margin_heuristic(&self, product: &ProductRecord) -> PriceRecommendation {
        let current = product.sale_price;
        let (recommended, reason) = match product.margin_pct() {
            Some(margin) if margin < LOW_MARGIN_PCT => {
                let cost = product.cost_price.unwrap_or_default();
                (cost * dec!(1.25), PriceRationale::LowMargin)
            }
            Some(margin) if margin > HIGH_MARGIN_PCT => {
                (current * dec!(0.95), PriceRationale::HighMargin)
            }
            Some(_) => (current, PriceRationale::HealthyMargin),
            None => (current, PriceRationale::MissingCostData),
        };

        PriceRecommendation {
            product_id: product.id,
            current_price: current,
            recommended_price: recommended.round_dp(2),
            elasticity: -1.0,
            reason,
            confidence: HEURISTIC_CONFIDENCE,
            expected_change_pct: change_pct(current, recommended),
            method: DerivationMethod::Default,
        }
    }

    /// Recommended price never drops below the minimum margin over cost
    /// when cost data exists, or 80 percent of the current price when it
    /// does not.
    fn apply_price_floor(&self, product: &ProductRecord, recommended: Decimal) -> Decimal {
        let floor = match product.cost_price {
            Some(cost) if cost > Decimal::ZERO => {
                cost * Decimal::from_f64(self.config.min_margin_factor).unwrap_or(dec!(1.2))
            }
            _ => product.sale_price * dec!(0.8),
        };
        recommended.max(floor)
    }
}

fn change_pct(current: Decimal, recommended: Decimal) -> f64 {
    if current <= Decimal::ZERO {
        return 0.0;
    }
    let current = current.to_f64().unwrap_or(0.0);
    let recommended = recommended.to_f64().unwrap_or(0.0);
    ((recommended - current) / current * 1000.0).round() / 10.0
}
