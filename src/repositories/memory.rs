use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Insight, ProductRecord, SaleLineItem, StoredInsight, TransactionSummary};

use super::{InsightStore, ModelArtifactStore, TransactionRepository};

/// In-memory transaction repository backed by plain vectors.
///
/// Used by the test suite and by embedded deployments that load history
/// from an export rather than a live datastore.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    transactions: RwLock<Vec<TransactionSummary>>,
    line_items: RwLock<Vec<(Uuid, SaleLineItem)>>,
    products: DashMap<Uuid, ProductRecord>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&self, tx: TransactionSummary) {
        self.transactions
            .write()
            .expect("transaction lock poisoned")
            .push(tx);
    }

    pub fn add_line_item(&self, shop_id: Uuid, item: SaleLineItem) {
        self.line_items
            .write()
            .expect("line item lock poisoned")
            .push((shop_id, item));
    }

    pub fn upsert_product(&self, product: ProductRecord) {
        self.products.insert(product.id, product);
    }
}

fn in_range(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    date >= from && date <= to
}

#[async_trait]
impl TransactionRepository for InMemoryRepository {
    async fn list_transactions(
        &self,
        shop_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionSummary>, EngineError> {
        let mut rows: Vec<TransactionSummary> = self
            .transactions
            .read()
            .expect("transaction lock poisoned")
            .iter()
            .filter(|tx| {
                tx.shop_id == shop_id && in_range(tx.recorded_at.date_naive(), from, to)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|tx| tx.recorded_at);
        Ok(rows)
    }

    async fn list_line_items_for_shop(
        &self,
        shop_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SaleLineItem>, EngineError> {
        Ok(self
            .line_items
            .read()
            .expect("line item lock poisoned")
            .iter()
            .filter(|(owner, item)| {
                *owner == shop_id && in_range(item.recorded_at.date_naive(), from, to)
            })
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn list_line_items_for_product(
        &self,
        product_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SaleLineItem>, EngineError> {
        Ok(self
            .line_items
            .read()
            .expect("line item lock poisoned")
            .iter()
            .filter(|(_, item)| {
                item.product_id == product_id && in_range(item.recorded_at.date_naive(), from, to)
            })
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn get_product(&self, product_id: Uuid) -> Result<Option<ProductRecord>, EngineError> {
        Ok(self.products.get(&product_id).map(|p| p.clone()))
    }

    async fn list_active_products(
        &self,
        shop_id: Uuid,
    ) -> Result<Vec<ProductRecord>, EngineError> {
        let mut products: Vec<ProductRecord> = self
            .products
            .iter()
            .filter(|p| p.shop_id == shop_id && p.is_active)
            .map(|p| p.clone())
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }
}

/// In-memory insight store. The per-shop vector is swapped under one
/// write-lock section, so the clear-then-insert of a regeneration is
/// observed as a single replacement.
#[derive(Debug, Default)]
pub struct InMemoryInsightStore {
    by_shop: RwLock<HashMap<Uuid, Vec<StoredInsight>>>,
}

impl InMemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InsightStore for InMemoryInsightStore {
    async fn replace_for_shop(
        &self,
        shop_id: Uuid,
        insights: Vec<Insight>,
    ) -> Result<Vec<StoredInsight>, EngineError> {
        let now = Utc::now();
        let stored: Vec<StoredInsight> = insights
            .into_iter()
            .map(|insight| StoredInsight {
                id: Uuid::new_v4(),
                shop_id,
                insight,
                is_read: false,
                is_active: true,
                created_at: now,
            })
            .collect();
        self.by_shop
            .write()
            .expect("insight lock poisoned")
            .insert(shop_id, stored.clone());
        Ok(stored)
    }

    async fn list_for_shop(&self, shop_id: Uuid) -> Result<Vec<StoredInsight>, EngineError> {
        let mut rows: Vec<StoredInsight> = self
            .by_shop
            .read()
            .expect("insight lock poisoned")
            .get(&shop_id)
            .map(|rows| rows.iter().filter(|r| r.is_active).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_read(&self, insight_id: Uuid) -> Result<bool, EngineError> {
        let mut by_shop = self.by_shop.write().expect("insight lock poisoned");
        for rows in by_shop.values_mut() {
            if let Some(row) = rows.iter_mut().find(|r| r.id == insight_id) {
                row.is_read = true;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// In-memory artifact store keyed by shop id.
#[derive(Debug, Default)]
pub struct InMemoryModelArtifactStore {
    blobs: DashMap<Uuid, Vec<u8>>,
}

impl InMemoryModelArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelArtifactStore for InMemoryModelArtifactStore {
    async fn load(&self, shop_id: Uuid) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.blobs.get(&shop_id).map(|b| b.clone()))
    }

    async fn save(&self, shop_id: Uuid, bytes: &[u8]) -> Result<(), EngineError> {
        self.blobs.insert(shop_id, bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, shop_id: Uuid) -> Result<(), EngineError> {
        self.blobs.remove(&shop_id);
        Ok(())
    }
}
