use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Median};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::config::SegmentationConfig;
use crate::errors::EngineError;
use crate::ml::kmeans::{self, KMeansConfig};
use crate::ml::scaler::StandardScaler;
use crate::models::{CustomerSegment, RfmMetrics, SegmentLabel};
use crate::repositories::TransactionRepository;

/// Champions: bought within this many days and at least this often.
const CHAMPION_RECENCY_DAYS: f64 = 30.0;
const CHAMPION_FREQUENCY: f64 = 3.0;

/// Loyal: bought within this many days with above-median spend.
const LOYAL_RECENCY_DAYS: f64 = 60.0;

/// Customer segmenter: Recency/Frequency/Monetary metrics per customer
/// clustered into named behavioral segments, degrading to one
/// "Regular Customer" segment per customer when the population is too
/// small to cluster.
pub struct CustomerSegmentationService {
    repo: Arc<dyn TransactionRepository>,
    config: SegmentationConfig,
}

impl CustomerSegmentationService {
    pub fn new(repo: Arc<dyn TransactionRepository>, config: SegmentationConfig) -> Self {
        Self { repo, config }
    }

    /// Segment a shop's customers over the trailing analysis window.
    /// Customers are keyed by name; anonymous transactions are skipped.
    #[instrument(skip(self))]
    pub async fn segment(&self, shop_id: Uuid) -> Result<Vec<CustomerSegment>, EngineError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(self.config.lookback_days);
        let transactions = self.repo.list_transactions(shop_id, from, today).await?;

        let metrics = rfm_metrics(&transactions, today);
        if metrics.is_empty() {
            return Ok(Vec::new());
        }
        if metrics.len() < self.config.cluster_count {
            return Ok(simple_segmentation(&metrics, self.config.cluster_count));
        }

        let rows: Vec<Vec<f64>> = metrics
            .iter()
            .map(|m| vec![m.recency_days, m.frequency, m.monetary])
            .collect();
        let assignments = StandardScaler::fit(&rows)
            .and_then(|scaler| scaler.transform_all(&rows))
            .and_then(|scaled| {
                kmeans::cluster(
                    &KMeansConfig {
                        cluster_count: self.config.cluster_count,
                        max_iterations: self.config.max_iterations,
                        seed: self.config.seed,
                    },
                    &scaled,
                )
            });

        let assignments = match assignments {
            Ok(assignments) => assignments,
            Err(err) => {
                warn!(error = %err, "clustering failed, per-customer segments");
                return Ok(simple_segmentation(&metrics, self.config.cluster_count));
            }
        };

        // clusters labeled in fixed index order
        let segments = (0..self.config.cluster_count)
            .map(|cluster| {
                let members: Vec<&RfmMetrics> = metrics
                    .iter()
                    .zip(&assignments)
                    .filter(|(_, assigned)| **assigned == cluster)
                    .map(|(m, _)| m)
                    .collect();
                build_segment(cluster as u32, &members)
            })
            .collect();
        Ok(segments)
    }
}

/// RFM per customer in name order, so downstream math is deterministic.
fn rfm_metrics(
    transactions: &[crate::models::TransactionSummary],
    today: NaiveDate,
) -> Vec<RfmMetrics> {
    struct Rollup {
        last_purchase: NaiveDate,
        count: u64,
        total: f64,
    }

    let mut by_customer: BTreeMap<String, Rollup> = BTreeMap::new();
    for tx in transactions {
        let Some(name) = tx.customer_name.as_deref().filter(|n| !n.is_empty()) else {
            continue;
        };
        let date = tx.recorded_at.date_naive();
        let amount = tx.total_amount.to_f64().unwrap_or(0.0);
        by_customer
            .entry(name.to_string())
            .and_modify(|r| {
                r.last_purchase = r.last_purchase.max(date);
                r.count += 1;
                r.total += amount;
            })
            .or_insert(Rollup {
                last_purchase: date,
                count: 1,
                total: amount,
            });
    }

    by_customer
        .into_iter()
        .map(|(customer_name, rollup)| RfmMetrics {
            customer_name,
            recency_days: (today - rollup.last_purchase).num_days() as f64,
            frequency: rollup.count as f64,
            monetary: rollup.total,
        })
        .collect()
}

/// One segment per customer when the population is too small to cluster.
fn simple_segmentation(metrics: &[RfmMetrics], cap: usize) -> Vec<CustomerSegment> {
    metrics
        .iter()
        .take(cap)
        .enumerate()
        .map(|(i, m)| CustomerSegment {
            segment_id: i as u32,
            label: SegmentLabel::RegularCustomer,
            customers: vec![m.customer_name.clone()],
            customer_count: 1,
            avg_recency_days: m.recency_days,
            avg_frequency: m.frequency,
            avg_monetary: m.monetary,
        })
        .collect()
}

fn build_segment(segment_id: u32, members: &[&RfmMetrics]) -> CustomerSegment {
    let n = members.len() as f64;
    let (avg_recency, avg_frequency, avg_monetary) = if members.is_empty() {
        (f64::INFINITY, 0.0, 0.0)
    } else {
        (
            members.iter().map(|m| m.recency_days).sum::<f64>() / n,
            members.iter().map(|m| m.frequency).sum::<f64>() / n,
            members.iter().map(|m| m.monetary).sum::<f64>() / n,
        )
    };

    let label = if avg_recency <= CHAMPION_RECENCY_DAYS && avg_frequency >= CHAMPION_FREQUENCY {
        SegmentLabel::Champions
    } else if avg_recency <= LOYAL_RECENCY_DAYS && avg_monetary >= median_monetary(members) {
        SegmentLabel::LoyalCustomers
    } else {
        SegmentLabel::AtRisk
    };

    CustomerSegment {
        segment_id,
        label,
        customers: members.iter().map(|m| m.customer_name.clone()).collect(),
        customer_count: members.len(),
        avg_recency_days: round1(avg_recency),
        avg_frequency: round1(avg_frequency),
        avg_monetary: round2(avg_monetary),
    }
}

fn median_monetary(members: &[&RfmMetrics]) -> f64 {
    if members.is_empty() {
        return 0.0;
    }
    Data::new(members.iter().map(|m| m.monetary).collect::<Vec<f64>>()).median()
}

fn round1(value: f64) -> f64 {
    if value.is_finite() {
        (value * 10.0).round() / 10.0
    } else {
        value
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn tx(name: &str, day: u32, amount: i64) -> crate::models::TransactionSummary {
        crate::models::TransactionSummary {
            id: Uuid::new_v4(),
            shop_id: Uuid::new_v4(),
            recorded_at: chrono::Utc.with_ymd_and_hms(2024, 6, day, 9, 0, 0).unwrap(),
            total_amount: Decimal::from(amount),
            customer_name: Some(name.to_string()),
        }
    }

    #[test]
    fn rfm_rolls_up_per_customer() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let metrics = rfm_metrics(
            &[tx("Asha", 10, 200), tx("Asha", 20, 300), tx("Bilal", 28, 50)],
            today,
        );
        assert_eq!(metrics.len(), 2);
        let asha = &metrics[0];
        assert_eq!(asha.customer_name, "Asha");
        assert_eq!(asha.recency_days, 10.0);
        assert_eq!(asha.frequency, 2.0);
        assert_eq!(asha.monetary, 500.0);
    }

    #[test]
    fn anonymous_transactions_are_skipped() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let mut anonymous = tx("", 10, 100);
        anonymous.customer_name = Some(String::new());
        let mut unnamed = tx("x", 11, 100);
        unnamed.customer_name = None;
        assert!(rfm_metrics(&[anonymous, unnamed], today).is_empty());
    }

    #[test]
    fn champion_label_requires_recent_frequent_buyers() {
        let members = vec![
            RfmMetrics {
                customer_name: "a".into(),
                recency_days: 5.0,
                frequency: 4.0,
                monetary: 900.0,
            },
            RfmMetrics {
                customer_name: "b".into(),
                recency_days: 15.0,
                frequency: 3.0,
                monetary: 700.0,
            },
        ];
        let refs: Vec<&RfmMetrics> = members.iter().collect();
        assert_eq!(build_segment(0, &refs).label, SegmentLabel::Champions);
    }

    #[test]
    fn stale_clusters_fall_through_to_at_risk() {
        let members = vec![RfmMetrics {
            customer_name: "c".into(),
            recency_days: 80.0,
            frequency: 1.0,
            monetary: 100.0,
        }];
        let refs: Vec<&RfmMetrics> = members.iter().collect();
        assert_eq!(build_segment(2, &refs).label, SegmentLabel::AtRisk);
    }
}
