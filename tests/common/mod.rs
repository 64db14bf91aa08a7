//! Shared fixtures: an engine wired over in-memory backends plus
//! builders that seed a shop with bills, line items, and products.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use shoplytics::config::EngineConfig;
use shoplytics::models::{ProductRecord, SaleLineItem, TransactionSummary};
use shoplytics::repositories::{
    InMemoryInsightStore, InMemoryModelArtifactStore, InMemoryRepository,
};
use shoplytics::InsightEngine;

pub struct TestShop {
    pub shop_id: Uuid,
    pub repo: Arc<InMemoryRepository>,
    pub store: Arc<InMemoryInsightStore>,
    pub artifacts: Arc<InMemoryModelArtifactStore>,
    pub engine: InsightEngine,
}

pub fn test_shop() -> TestShop {
    test_shop_with_config(EngineConfig::default())
}

pub fn test_shop_with_config(config: EngineConfig) -> TestShop {
    let repo = Arc::new(InMemoryRepository::new());
    let store = Arc::new(InMemoryInsightStore::new());
    let artifacts = Arc::new(InMemoryModelArtifactStore::new());
    let engine = InsightEngine::new(repo.clone(), store.clone(), artifacts.clone(), config);
    TestShop {
        shop_id: Uuid::new_v4(),
        repo,
        store,
        artifacts,
        engine,
    }
}

impl TestShop {
    /// Record one bill `days_ago` days back.
    pub fn bill(&self, days_ago: i64, amount: i64, customer: Option<&str>) {
        self.repo.add_transaction(TransactionSummary {
            id: Uuid::new_v4(),
            shop_id: self.shop_id,
            recorded_at: Utc::now() - Duration::days(days_ago),
            total_amount: Decimal::from(amount),
            customer_name: customer.map(str::to_string),
        });
    }

    /// Register a product for this shop.
    pub fn product(
        &self,
        name: &str,
        stock: i32,
        cost_price: Option<i64>,
        sale_price: i64,
    ) -> ProductRecord {
        let product = ProductRecord {
            id: Uuid::new_v4(),
            shop_id: self.shop_id,
            name: name.to_string(),
            stock,
            cost_price: cost_price.map(Decimal::from),
            sale_price: Decimal::from(sale_price),
            min_stock_alert: 5,
            is_active: true,
        };
        self.repo.upsert_product(product.clone());
        product
    }

    /// Record one sale line item for a product `days_ago` days back.
    pub fn sale(&self, product: &ProductRecord, days_ago: i64, quantity: i64, unit_price: i64) {
        self.repo.add_line_item(
            self.shop_id,
            SaleLineItem {
                product_id: product.id,
                product_name: product.name.clone(),
                recorded_at: Utc::now() - Duration::days(days_ago),
                quantity: Decimal::from(quantity),
                unit_price: Decimal::from(unit_price),
            },
        );
    }

    /// Seed `days` consecutive daily bills ending yesterday, all with
    /// the same total.
    pub fn constant_daily_history(&self, days: i64, amount: i64) {
        for days_ago in 1..=days {
            self.bill(days_ago, amount, None);
        }
    }
}
