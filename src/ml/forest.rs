use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Configuration for the bagged regression-tree ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub tree_count: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Seed for bootstrap and feature subsampling; fixed so training is
    /// reproducible for a given shop history.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            tree_count: 100,
            max_depth: 10,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegressionTree {
    root: Node,
}

/// Bagged ensemble of variance-minimizing regression trees.
///
/// Each tree is grown on a bootstrap resample with a random feature
/// subset considered at every split; the ensemble prediction is the
/// mean of the tree outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    feature_count: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    pub fn fit(
        config: ForestConfig,
        rows: &[Vec<f64>],
        targets: &[f64],
    ) -> Result<Self, EngineError> {
        let first = rows
            .first()
            .ok_or_else(|| EngineError::InsufficientData("empty training matrix".into()))?;
        let feature_count = first.len();
        if rows.len() != targets.len() {
            return Err(EngineError::ComputationError(
                "row/target length mismatch".into(),
            ));
        }
        if rows.iter().any(|row| row.len() != feature_count) {
            return Err(EngineError::ComputationError(
                "ragged training matrix".into(),
            ));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(EngineError::ComputationError(
                "non-finite training target".into(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let n = rows.len();
        let mtry = (feature_count / 3).max(1);
        let mut trees = Vec::with_capacity(config.tree_count);

        for _ in 0..config.tree_count {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let root = grow(rows, targets, &sample, 0, mtry, &config, &mut rng);
            trees.push(RegressionTree { root });
        }

        Ok(Self {
            config,
            feature_count,
            trees,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Predict one sample. A vector of the wrong width is rejected
    /// before any tree is consulted.
    pub fn predict(&self, features: &[f64]) -> Result<f64, EngineError> {
        if features.len() != self.feature_count {
            return Err(EngineError::ComputationError(format!(
                "feature count mismatch: {} instead of {}",
                features.len(),
                self.feature_count
            )));
        }
        if self.trees.is_empty() {
            return Err(EngineError::ComputationError("empty ensemble".into()));
        }
        let sum: f64 = self.trees.iter().map(|t| t.root.predict(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn grow(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    depth: usize,
    mtry: usize,
    config: &ForestConfig,
    rng: &mut StdRng,
) -> Node {
    let mean = mean_of(targets, indices);
    if depth >= config.max_depth || indices.len() < config.min_samples_leaf * 2 {
        return Node::Leaf { value: mean };
    }
    let sse: f64 = indices
        .iter()
        .map(|&i| (targets[i] - mean).powi(2))
        .sum();
    if sse <= f64::EPSILON {
        return Node::Leaf { value: mean };
    }

    let feature_count = rows[0].len();
    let candidates = rand::seq::index::sample(rng, feature_count, mtry.min(feature_count));

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, score)
    for feature in candidates {
        if let Some((threshold, score)) =
            best_split_on(rows, targets, indices, feature, config.min_samples_leaf)
        {
            if best.map_or(true, |(_, _, s)| score < s) {
                best = Some((feature, threshold, score));
            }
        }
    }

    let Some((feature, threshold, _)) = best else {
        return Node::Leaf { value: mean };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, targets, &left_idx, depth + 1, mtry, config, rng)),
        right: Box::new(grow(rows, targets, &right_idx, depth + 1, mtry, config, rng)),
    }
}

/// Best threshold for one feature by summed squared error, or None when
/// no split leaves both sides at the leaf minimum.
fn best_split_on(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    feature: usize,
    min_leaf: usize,
) -> Option<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = indices
        .iter()
        .map(|&i| (rows[i][feature], targets[i]))
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let n = pairs.len();
    let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
    let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();

    let mut left_sum = 0.0;
    let mut left_sq = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for i in 0..n - 1 {
        left_sum += pairs[i].1;
        left_sq += pairs[i].1 * pairs[i].1;

        // splits only between distinct feature values
        if pairs[i].0 == pairs[i + 1].0 {
            continue;
        }
        let left_n = i + 1;
        let right_n = n - left_n;
        if left_n < min_leaf || right_n < min_leaf {
            continue;
        }

        let left_sse = left_sq - left_sum * left_sum / left_n as f64;
        let right_sum = total_sum - left_sum;
        let right_sse = (total_sq - left_sq) - right_sum * right_sum / right_n as f64;
        let score = left_sse + right_sse;

        if best.map_or(true, |(_, s)| score < s) {
            best = Some(((pairs[i].0 + pairs[i + 1].0) / 2.0, score));
        }
    }

    best
}
