//! Persistence seam for the order ledger.
//!
//! A [`LedgerStore`] hands out [`LedgerTx`] units of work. Everything done through
//! a transaction becomes visible only on [`LedgerTx::commit`]; dropping the
//! transaction discards it. Operations outside a transaction are the
//! post-commit side effects and read paths.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Notification, Order, OrderItem, OrderStatus, Promotion};

pub mod memory;
pub mod sea;

pub use memory::MemoryStore;
pub use sea::SeaOrmStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// What checkout needs to know about a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub oldest_first: bool,
    pub limit: u64,
    pub offset: u64,
}

/// A cart row reduced to what an order line needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError>;

    /// Page of orders plus the total matching count.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64), StoreError>;

    async fn find_promotion(&self, code: &str) -> Result<Option<Promotion>, StoreError>;

    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError>;

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64, StoreError>;

    async fn notify(&self, notification: Notification) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    async fn purchasable_product(
        &mut self,
        product_id: Uuid,
    ) -> Result<Option<ProductSnapshot>, StoreError>;

    /// Looks a promotion up by normalized code, locking it until commit.
    async fn promotion_for_update(&mut self, code: &str) -> Result<Option<Promotion>, StoreError>;

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError>;

    /// Decrements stock only if at least `quantity` is available.
    /// Returns `false` when nothing was reserved.
    async fn reserve_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<bool, StoreError>;

    async fn release_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<(), StoreError>;

    /// Bumps `usage_count` only while it is below `usage_limit`.
    async fn redeem_promotion(&mut self, promotion_id: Uuid) -> Result<bool, StoreError>;

    async fn order_for_update(&mut self, order_id: Uuid) -> Result<Option<OrderRecord>, StoreError>;

    /// Persists the mutable header fields of an existing order.
    async fn save_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
