use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Engine error types.
///
/// Analyzers are written so that data-insufficiency and numerical failures
/// are absorbed locally into a lower-confidence fallback result; the only
/// variants expected to reach a caller are repository and artifact-store
/// failures.
#[derive(Error, Debug, Serialize)]
pub enum EngineError {
    /// Not enough history for the requested algorithm. Always recoverable
    /// by a simpler statistical or heuristic method.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A persisted model or scaler failed to load, or its feature
    /// dimensionality does not match the current feature contract.
    #[error("Model artifact corrupt: {0}")]
    ModelArtifactCorrupt(String),

    /// Numerical failure inside an analyzer (singular regression fit,
    /// guarded division by zero, non-finite intermediate).
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// The transaction/product read collaborator is unavailable.
    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Whether a component may degrade to its documented default path
    /// instead of surfacing this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::RepositoryError(_))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::RepositoryError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ModelArtifactCorrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_are_not_recoverable() {
        assert!(!EngineError::RepositoryError("db down".into()).is_recoverable());
        assert!(EngineError::InsufficientData("3 rows".into()).is_recoverable());
        assert!(EngineError::ComputationError("singular fit".into()).is_recoverable());
    }

    #[test]
    fn io_errors_map_to_repository_errors() {
        let err: EngineError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, EngineError::RepositoryError(_)));
    }
}
