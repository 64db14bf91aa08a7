/*!
 * # Engine Data Model
 *
 * Value objects exchanged between the analyzers and their collaborators.
 * Every entity is scoped to exactly one shop; the engine never mixes data
 * across shops. All types are plain structured records renderable to JSON
 * without further transformation.
 */

pub mod customers;
pub mod insights;
pub mod inventory;
pub mod pricing;
pub mod sales;

use serde::{Deserialize, Serialize};
use strum::Display;

pub use customers::{CustomerSegment, RfmMetrics, SegmentLabel};
pub use insights::{Insight, InsightKind, InsightPriority, StoredInsight};
pub use inventory::{InventoryProfile, ProductRecord, StockoutPrediction};
pub use pricing::{PriceRationale, PriceRecommendation};
pub use sales::{
    DailySalesPoint, ForecastMethod, ForecastResult, ProductPerformance, SaleLineItem,
    SalesSummary, TransactionSummary,
};

/// Provenance of a fallback-capable analysis result.
///
/// Every analyzer that degrades along a learned → statistical → default
/// chain tags its output so callers can branch on provenance without
/// inspecting magic fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DerivationMethod {
    /// Produced by a fitted model over engineered features
    Learned,
    /// Produced by summary statistics over raw history
    Statistical,
    /// Produced by fixed defaults when history is insufficient
    Default,
}
