use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Per-feature standardization: subtract the training mean, divide by
/// the training standard deviation. Constant features scale by 1 so a
/// zero-variance column passes through centered instead of dividing by
/// zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and scales over the training matrix. Rows must share
    /// one width.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, EngineError> {
        let first = rows
            .first()
            .ok_or_else(|| EngineError::InsufficientData("empty feature matrix".into()))?;
        let width = first.len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(EngineError::ComputationError(
                "ragged feature matrix".into(),
            ));
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (m, value) in means.iter_mut().zip(row) {
                *m += value;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((s, value), mean) in scales.iter_mut().zip(row).zip(&means) {
                *s += (value - mean).powi(2);
            }
        }
        for s in &mut scales {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { means, scales })
    }

    pub fn feature_count(&self) -> usize {
        self.means.len()
    }

    /// Standardize one sample. Rejects width mismatches before they
    /// reach the model.
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, EngineError> {
        if features.len() != self.means.len() {
            return Err(EngineError::ComputationError(format!(
                "feature count mismatch: {} instead of {}",
                features.len(),
                self.means.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect())
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, EngineError> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}
