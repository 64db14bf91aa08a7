use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use statrs::statistics::Statistics;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ForecastConfig;
use crate::errors::EngineError;
use crate::ml::features::{future_features, is_boosted_day, FeatureBuilder};
use crate::ml::forest::{ForestConfig, RandomForestRegressor};
use crate::ml::registry::{ModelRegistry, TrainedSalesModel};
use crate::ml::scaler::StandardScaler;
use crate::models::{ForecastMethod, ForecastResult};
use crate::repositories::{ModelArtifactStore, TransactionRepository};

/// Confidence reported by the statistical fallback path.
const FALLBACK_CONFIDENCE: u8 = 50;

/// Chained predictions feed a rolling window capped at this many values.
const RECENT_WINDOW_CAP: usize = 30;

/// Demand forecaster: fits a regression ensemble over engineered daily
/// features and predicts future daily sales, degrading to a weighted
/// moving-average method whenever data or the model falls short.
///
/// One model artifact pair (forest + scaler) exists per shop; the
/// in-process registry caches loaded artifacts until an explicit
/// retrain.
pub struct DemandForecastService {
    repo: Arc<dyn TransactionRepository>,
    artifacts: Arc<dyn ModelArtifactStore>,
    registry: ModelRegistry,
    config: ForecastConfig,
}

impl DemandForecastService {
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        artifacts: Arc<dyn ModelArtifactStore>,
        config: ForecastConfig,
    ) -> Self {
        Self {
            repo,
            artifacts,
            registry: ModelRegistry::new(),
            config,
        }
    }

    /// Predict daily sales for the next `horizon_days` days, one entry
    /// per day ascending from tomorrow.
    ///
    /// Only repository failures surface; every modeling failure is
    /// absorbed into the statistical fallback for the whole horizon.
    #[instrument(skip(self))]
    pub async fn predict(
        &self,
        shop_id: Uuid,
        horizon_days: u32,
    ) -> Result<Vec<ForecastResult>, EngineError> {
        let today = Utc::now().date_naive();
        let recent = self.recent_daily_totals(shop_id, today).await?;

        let model = match self.ensure_model(shop_id, today).await {
            Ok(model) => model,
            Err(err) if err.is_recoverable() => {
                warn!(%shop_id, error = %err, "model unavailable, using statistical fallback");
                None
            }
            Err(err) => return Err(err),
        };

        let Some(model) = model else {
            return Ok(self.statistical_fallback(today, &recent, horizon_days));
        };
        if recent.is_empty() {
            return Ok(self.statistical_fallback(today, &recent, horizon_days));
        }

        match self.learned_forecast(&model, today, &recent, horizon_days) {
            Ok(results) => Ok(results),
            Err(err) => {
                warn!(%shop_id, error = %err, "learned path failed, using statistical fallback");
                Ok(self.statistical_fallback(today, &recent, horizon_days))
            }
        }
    }

    /// Horizon used when the caller does not specify one.
    pub fn default_horizon(&self) -> u32 {
        self.config.horizon_days
    }

    /// The no-history statistical forecast: deterministic default base
    /// amount with the weekday multiplier. Used when a compute budget
    /// expires before real history could be read.
    pub fn default_forecast(&self, horizon_days: u32) -> Vec<ForecastResult> {
        self.statistical_fallback(Utc::now().date_naive(), &[], horizon_days)
    }

    /// Discard the shop's persisted model and refit from current data.
    /// Returns false when fewer usable rows exist than training needs.
    #[instrument(skip(self))]
    pub async fn retrain(&self, shop_id: Uuid) -> Result<bool, EngineError> {
        let lock = self.registry.train_lock(shop_id);
        let _guard = lock.lock().await;

        self.artifacts.delete(shop_id).await?;
        self.registry.evict(shop_id);

        let today = Utc::now().date_naive();
        match self.train_locked(shop_id, today).await? {
            Some(_) => {
                info!(%shop_id, "model retrained");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Daily totals over the recent lookback window, ascending.
    async fn recent_daily_totals(
        &self,
        shop_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<f64>, EngineError> {
        let from = today - Duration::days(self.config.recent_lookback_days);
        let transactions = self.repo.list_transactions(shop_id, from, today).await?;
        Ok(FeatureBuilder::daily_series(&transactions)
            .into_iter()
            .map(|(_, total)| total)
            .collect())
    }

    /// Resolve the shop's model: registry, then persisted artifact, then
    /// a fresh fit. A corrupt artifact gets one retrain before giving up.
    async fn ensure_model(
        &self,
        shop_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<Arc<TrainedSalesModel>>, EngineError> {
        if let Some(model) = self.registry.get(shop_id) {
            return Ok(Some(model));
        }

        let lock = self.registry.train_lock(shop_id);
        let _guard = lock.lock().await;
        if let Some(model) = self.registry.get(shop_id) {
            return Ok(Some(model));
        }

        match self.artifacts.load(shop_id).await? {
            Some(bytes) => match TrainedSalesModel::from_bytes(&bytes) {
                Ok(model) => Ok(Some(self.registry.insert(shop_id, model))),
                Err(err) => {
                    warn!(%shop_id, error = %err, "discarding corrupt model artifact");
                    self.artifacts.delete(shop_id).await?;
                    self.train_locked(shop_id, today).await
                }
            },
            None => self.train_locked(shop_id, today).await,
        }
    }

    /// Fit and persist a model for the shop. Caller holds the shop's
    /// train lock. None means not enough usable rows.
    async fn train_locked(
        &self,
        shop_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<Arc<TrainedSalesModel>>, EngineError> {
        let from = today - Duration::days(self.config.training_lookback_days);
        let transactions = self.repo.list_transactions(shop_id, from, today).await?;

        let builder = FeatureBuilder::new(self.config.min_training_rows);
        let points = builder.build(&transactions);
        if points.is_empty() {
            info!(%shop_id, "insufficient history for model training");
            return Ok(None);
        }

        let rows: Vec<Vec<f64>> = points.iter().map(|p| p.features().to_vec()).collect();
        let targets: Vec<f64> = points.iter().map(|p| p.total_amount).collect();

        let fitted = StandardScaler::fit(&rows).and_then(|scaler| {
            let scaled = scaler.transform_all(&rows)?;
            let forest = RandomForestRegressor::fit(
                ForestConfig {
                    tree_count: self.config.tree_count,
                    seed: self.config.seed,
                    ..ForestConfig::default()
                },
                &scaled,
                &targets,
            )?;
            Ok(TrainedSalesModel::new(forest, scaler))
        });

        let model = match fitted {
            Ok(model) => model,
            Err(err) => {
                warn!(%shop_id, error = %err, "model training failed");
                return Ok(None);
            }
        };

        self.artifacts.save(shop_id, &model.to_bytes()?).await?;
        info!(%shop_id, rows = rows.len(), "sales model trained");
        Ok(Some(self.registry.insert(shop_id, model)))
    }

    /// Chained one-step-ahead prediction: each day's output becomes a
    /// lag input for the next. Strictly sequential by construction.
    fn learned_forecast(
        &self,
        model: &TrainedSalesModel,
        today: NaiveDate,
        recent: &[f64],
        horizon_days: u32,
    ) -> Result<Vec<ForecastResult>, EngineError> {
        let confidence = history_confidence(recent);
        let mut window: Vec<f64> = recent
            .iter()
            .copied()
            .skip(recent.len().saturating_sub(RECENT_WINDOW_CAP))
            .collect();
        let mut results = Vec::with_capacity(horizon_days as usize);

        for day in 1..=i64::from(horizon_days) {
            let date = today + Duration::days(day);
            let features = future_features(date, &window);
            let predicted = model.predict(&features)?.max(0.0);

            results.push(ForecastResult {
                date,
                predicted_amount: to_money(predicted),
                confidence,
                method: ForecastMethod::Ml,
            });

            window.push(predicted);
            if window.len() > RECENT_WINDOW_CAP {
                window.remove(0);
            }
        }
        Ok(results)
    }

    /// Weighted moving-average fallback: trailing mean with a weekday
    /// multiplier, fixed confidence, no hidden randomness.
    fn statistical_fallback(
        &self,
        today: NaiveDate,
        recent: &[f64],
        horizon_days: u32,
    ) -> Vec<ForecastResult> {
        let base = if recent.is_empty() {
            self.config.default_daily_amount
        } else {
            recent.mean()
        };

        (1..=i64::from(horizon_days))
            .map(|day| {
                let date = today + Duration::days(day);
                let multiplier = if is_boosted_day(date) {
                    self.config.weekend_multiplier
                } else {
                    self.config.weekday_multiplier
                };
                ForecastResult {
                    date,
                    predicted_amount: to_money(base * multiplier),
                    confidence: FALLBACK_CONFIDENCE,
                    method: ForecastMethod::Statistical,
                }
            })
            .collect()
    }
}

/// Confidence from the spread of recent sales: thin history caps it,
/// otherwise the variance-to-mean ratio grades it.
fn history_confidence(recent: &[f64]) -> u8 {
    match recent.len() {
        0..=6 => 40,
        7..=13 => 60,
        14..=29 => 75,
        _ => {
            let mean = recent.mean();
            let cv = if mean > 0.0 {
                recent.population_variance() / mean
            } else {
                1.0
            };
            if cv < 0.3 {
                90
            } else if cv < 0.5 {
                80
            } else {
                70
            }
        }
    }
}

fn to_money(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}
