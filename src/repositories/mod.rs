/*!
 * # Repository Seams
 *
 * Read access to tenant-scoped transactional data, plus the two write
 * surfaces the engine owns: persisted insights and per-shop model
 * artifacts. Implementations over a real datastore live with the
 * surrounding application; the in-memory backends here serve tests and
 * embedded deployments.
 */

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Insight, ProductRecord, SaleLineItem, StoredInsight, TransactionSummary};

pub use fs::FsModelArtifactStore;
pub use memory::{InMemoryInsightStore, InMemoryModelArtifactStore, InMemoryRepository};

/// Per-shop, per-date-range read access to sales history and product
/// records. The engine never mutates this data.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Transactions for one shop, inclusive date range, ascending by time.
    async fn list_transactions(
        &self,
        shop_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionSummary>, EngineError>;

    /// Sale line items across a shop, inclusive date range.
    async fn list_line_items_for_shop(
        &self,
        shop_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SaleLineItem>, EngineError>;

    /// Sale line items for one product, inclusive date range.
    async fn list_line_items_for_product(
        &self,
        product_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SaleLineItem>, EngineError>;

    async fn get_product(&self, product_id: Uuid) -> Result<Option<ProductRecord>, EngineError>;

    async fn list_active_products(&self, shop_id: Uuid)
        -> Result<Vec<ProductRecord>, EngineError>;
}

/// Persisted insight records, shop-scoped.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Atomically replace the shop's insight set. A concurrent reader
    /// must never observe the cleared intermediate state.
    async fn replace_for_shop(
        &self,
        shop_id: Uuid,
        insights: Vec<Insight>,
    ) -> Result<Vec<StoredInsight>, EngineError>;

    /// Active insights for a shop, newest first.
    async fn list_for_shop(&self, shop_id: Uuid) -> Result<Vec<StoredInsight>, EngineError>;

    /// Flag one insight as read. Returns false when the id is unknown.
    async fn mark_read(&self, insight_id: Uuid) -> Result<bool, EngineError>;
}

/// Opaque model-artifact blobs, one per shop, replaceable atomically.
#[async_trait]
pub trait ModelArtifactStore: Send + Sync {
    async fn load(&self, shop_id: Uuid) -> Result<Option<Vec<u8>>, EngineError>;

    /// Replace the shop's artifact. Must be atomic: a concurrent load
    /// sees either the old blob or the new one, never a partial write.
    async fn save(&self, shop_id: Uuid, bytes: &[u8]) -> Result<(), EngineError>;

    async fn delete(&self, shop_id: Uuid) -> Result<(), EngineError>;
}
