use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::sales::FEATURE_COUNT;

use super::forest::RandomForestRegressor;
use super::scaler::StandardScaler;

/// A fitted demand model with its feature scaler, as persisted per shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedSalesModel {
    pub forest: RandomForestRegressor,
    pub scaler: StandardScaler,
    /// Width of the feature contract the artifact was trained under
    pub feature_count: usize,
    pub trained_at: DateTime<Utc>,
}

impl TrainedSalesModel {
    pub fn new(forest: RandomForestRegressor, scaler: StandardScaler) -> Self {
        let feature_count = forest.feature_count();
        Self {
            forest,
            scaler,
            feature_count,
            trained_at: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize an artifact blob, rejecting any whose feature
    /// dimensionality no longer matches the engine's contract.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let model: Self = serde_json::from_slice(bytes)?;
        if model.feature_count != FEATURE_COUNT
            || model.forest.feature_count() != FEATURE_COUNT
            || model.scaler.feature_count() != FEATURE_COUNT
        {
            return Err(EngineError::ModelArtifactCorrupt(format!(
                "feature count {} does not match contract {}",
                model.feature_count, FEATURE_COUNT
            )));
        }
        Ok(model)
    }

    /// Standardize and predict one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64, EngineError> {
        let scaled = self.scaler.transform(features)?;
        self.forest.predict(&scaled)
    }
}

/// Per-shop registry of loaded models plus per-shop training locks.
///
/// Train and retrain for one shop are critical sections: callers take
/// the shop's lock before touching the registry entry or the persisted
/// artifact, so concurrent retrains cannot interleave.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: DashMap<Uuid, Arc<TrainedSalesModel>>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, shop_id: Uuid) -> Option<Arc<TrainedSalesModel>> {
        self.models.get(&shop_id).map(|m| m.clone())
    }

    pub fn insert(&self, shop_id: Uuid, model: TrainedSalesModel) -> Arc<TrainedSalesModel> {
        let model = Arc::new(model);
        self.models.insert(shop_id, model.clone());
        model
    }

    pub fn evict(&self, shop_id: Uuid) {
        self.models.remove(&shop_id);
    }

    /// The mutual-exclusion handle for one shop's train/retrain section.
    pub fn train_lock(&self, shop_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(shop_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::ForestConfig;

    fn trained_model() -> TrainedSalesModel {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let v = i as f64;
                vec![
                    v % 7.0,
                    (v % 12.0) + 1.0,
                    (v % 28.0) + 1.0,
                    if v % 7.0 >= 5.0 { 1.0 } else { 0.0 },
                    0.0,
                    400.0 + v,
                    380.0 + v,
                    390.0 + v,
                ]
            })
            .collect();
        let targets: Vec<f64> = (0..20).map(|i| 400.0 + i as f64).collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let scaled = scaler.transform_all(&rows).unwrap();
        let forest = RandomForestRegressor::fit(
            ForestConfig {
                tree_count: 10,
                ..ForestConfig::default()
            },
            &scaled,
            &targets,
        )
        .unwrap();
        TrainedSalesModel::new(forest, scaler)
    }

    #[test]
    fn artifact_round_trip_preserves_predictions() {
        let model = trained_model();
        let bytes = model.to_bytes().unwrap();
        let restored = TrainedSalesModel::from_bytes(&bytes).unwrap();
        let x = [3.0, 6.0, 15.0, 0.0, 0.0, 410.0, 395.0, 402.0];
        assert_eq!(model.predict(&x).unwrap(), restored.predict(&x).unwrap());
    }

    #[test]
    fn garbage_bytes_are_reported_corrupt() {
        let err = TrainedSalesModel::from_bytes(b"not a model").unwrap_err();
        assert!(matches!(err, EngineError::ModelArtifactCorrupt(_)));
    }

    #[test]
    fn registry_is_scoped_per_shop() {
        let registry = ModelRegistry::new();
        let shop_a = Uuid::new_v4();
        let shop_b = Uuid::new_v4();
        registry.insert(shop_a, trained_model());
        assert!(registry.get(shop_a).is_some());
        assert!(registry.get(shop_b).is_none());
        registry.evict(shop_a);
        assert!(registry.get(shop_a).is_none());
    }

    #[tokio::test]
    async fn train_lock_serializes_same_shop() {
        let registry = Arc::new(ModelRegistry::new());
        let shop = Uuid::new_v4();
        let lock = registry.train_lock(shop);
        let guard = lock.lock().await;
        let second = registry.train_lock(shop);
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }
}
