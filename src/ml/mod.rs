/*!
 * # Model Math
 *
 * Hand-rolled statistical models behind the analyzers: time-series
 * feature engineering, a seeded bagged regression-tree ensemble with its
 * feature scaler, least-squares fitting for elasticity estimation, and
 * seeded centroid clustering for customer segmentation.
 *
 * Everything here is a pure transform over in-memory data; the services
 * layer owns repository access and fallback policy.
 */

/// Daily time-series aggregation and feature engineering
pub mod features;

/// Per-feature standardization
pub mod scaler;

/// Bagged regression-tree ensemble for demand prediction
pub mod forest;

/// Least-squares fitting for log-log elasticity estimation
pub mod regression;

/// Seeded centroid clustering for RFM segmentation
pub mod kmeans;

/// Per-shop registry and persistence of trained model artifacts
pub mod registry;
