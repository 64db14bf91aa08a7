//! Shoplytics Engine Library
//!
//! Forecasting and recommendation engine for multi-tenant retail
//! point-of-sale analytics: it turns each shop's transactional history
//! into demand forecasts, inventory reorder recommendations, price
//! elasticity estimates, RFM customer segments, and a ranked insight
//! feed. Request routing, rendering, and persistence schemas live with
//! the surrounding application; this crate consumes read-side
//! repository traits and produces plain structured records.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod ml;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use config::EngineConfig;
use repositories::{InsightStore, ModelArtifactStore, TransactionRepository};
use services::analytics::SalesAnalyticsService;
use services::customers::CustomerSegmentationService;
use services::forecasting::DemandForecastService;
use services::insights::InsightService;
use services::inventory::InventoryOptimizationService;
use services::pricing::PriceOptimizationService;

/// The engine's service bundle, wired over one repository, insight
/// store, and artifact store.
#[derive(Clone)]
pub struct InsightEngine {
    forecasting: Arc<DemandForecastService>,
    inventory: Arc<InventoryOptimizationService>,
    pricing: Arc<PriceOptimizationService>,
    segmentation: Arc<CustomerSegmentationService>,
    analytics: Arc<SalesAnalyticsService>,
    insights: Arc<InsightService>,
}

impl InsightEngine {
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        store: Arc<dyn InsightStore>,
        artifacts: Arc<dyn ModelArtifactStore>,
        config: EngineConfig,
    ) -> Self {
        let forecasting = Arc::new(DemandForecastService::new(
            repo.clone(),
            artifacts,
            config.forecast,
        ));
        let inventory = Arc::new(InventoryOptimizationService::new(
            repo.clone(),
            config.inventory,
        ));
        let pricing = Arc::new(PriceOptimizationService::new(repo.clone(), config.pricing));
        let segmentation = Arc::new(CustomerSegmentationService::new(
            repo.clone(),
            config.segmentation,
        ));
        let analytics = Arc::new(SalesAnalyticsService::new(repo.clone()));
        let insights = Arc::new(InsightService::new(
            repo,
            store,
            analytics.clone(),
            forecasting.clone(),
            inventory.clone(),
            pricing.clone(),
            segmentation.clone(),
            config.insights,
        ));

        Self {
            forecasting,
            inventory,
            pricing,
            segmentation,
            analytics,
            insights,
        }
    }

    pub fn forecasting(&self) -> Arc<DemandForecastService> {
        self.forecasting.clone()
    }

    pub fn inventory(&self) -> Arc<InventoryOptimizationService> {
        self.inventory.clone()
    }

    pub fn pricing(&self) -> Arc<PriceOptimizationService> {
        self.pricing.clone()
    }

    pub fn segmentation(&self) -> Arc<CustomerSegmentationService> {
        self.segmentation.clone()
    }

    pub fn analytics(&self) -> Arc<SalesAnalyticsService> {
        self.analytics.clone()
    }

    pub fn insights(&self) -> Arc<InsightService> {
        self.insights.clone()
    }
}
