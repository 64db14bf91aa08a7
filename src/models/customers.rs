use serde::{Deserialize, Serialize};
use strum::Display;

/// Recency/Frequency/Monetary metrics for one customer over the analysis
/// window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfmMetrics {
    pub customer_name: String,
    /// Days since the most recent purchase
    pub recency_days: f64,
    /// Transaction count in the window
    pub frequency: f64,
    /// Total spend in the window
    pub monetary: f64,
}

/// Named behavioral segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SegmentLabel {
    #[strum(serialize = "Champions")]
    Champions,
    #[strum(serialize = "Loyal Customers")]
    LoyalCustomers,
    #[strum(serialize = "At Risk")]
    AtRisk,
    #[strum(serialize = "Regular Customer")]
    RegularCustomer,
}

impl SegmentLabel {
    pub fn description(&self) -> &'static str {
        match self {
            SegmentLabel::Champions => "Best customers - high value, frequent buyers",
            SegmentLabel::LoyalCustomers => "Regular customers with good value",
            SegmentLabel::AtRisk => "Customers who need attention",
            SegmentLabel::RegularCustomer => "Individual customer analysis",
        }
    }
}

/// One cluster of customers with its aggregate RFM characteristics.
///
/// Produced transiently per analysis run; not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub segment_id: u32,
    pub label: SegmentLabel,
    pub customers: Vec<String>,
    pub customer_count: usize,
    pub avg_recency_days: f64,
    pub avg_frequency: f64,
    pub avg_monetary: f64,
}
