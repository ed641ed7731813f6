use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    ledger::promotion::normalize_code,
    models::{CartItem, Notification, Order, OrderItem, Product, Promotion},
};

use super::{
    CartLine, LedgerStore, LedgerTx, OrderFilter, OrderRecord, ProductSnapshot, StoreError,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<Uuid, Product>,
    promotions: HashMap<Uuid, Promotion>,
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
    carts: Vec<CartItem>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn record(&self, order_id: Uuid) -> Option<OrderRecord> {
        let order = self.orders.get(&order_id)?.clone();
        let mut items: Vec<OrderItem> = self
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        Some(OrderRecord { order, items })
    }
}

/// In-process store. Transactions are serialized on one lock and work on a
/// private copy of the tables that replaces the shared copy on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_side_effects: Arc<AtomicBool>,
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes cart clearing and notification writes fail, for exercising the
    /// non-fatal side-effect path.
    pub fn fail_side_effects(&self, fail: bool) {
        self.fail_side_effects.store(fail, Ordering::SeqCst);
    }

    pub async fn insert_product(&self, product: Product) {
        self.tables.lock().await.products.insert(product.id, product);
    }

    pub async fn set_price(&self, product_id: Uuid, price: i64) {
        if let Some(product) = self.tables.lock().await.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    pub async fn product(&self, product_id: Uuid) -> Option<Product> {
        self.tables.lock().await.products.get(&product_id).cloned()
    }

    pub async fn insert_promotion(&self, mut promotion: Promotion) {
        promotion.code = normalize_code(&promotion.code);
        self.tables
            .lock()
            .await
            .promotions
            .insert(promotion.id, promotion);
    }

    pub async fn promotion(&self, promotion_id: Uuid) -> Option<Promotion> {
        self.tables.lock().await.promotions.get(&promotion_id).cloned()
    }

    pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        self.tables.lock().await.carts.push(CartItem {
            id: Uuid::new_v4(),
            product_id,
            user_id,
            quantity,
            created_at: Utc::now(),
        });
    }

    pub async fn cart(&self, user_id: Uuid) -> Vec<CartItem> {
        self.tables
            .lock()
            .await
            .carts
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn notifications(&self, user_id: Uuid) -> Vec<Notification> {
        self.tables
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    fn side_effect_guard(&self) -> Result<(), StoreError> {
        if self.fail_side_effects.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("side effects disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self.tables.lock().await.record(id))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64), StoreError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| filter.user_id.is_none_or(|user| o.user_id == user))
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        if !filter.oldest_first {
            orders.reverse();
        }
        let total = orders.len() as u64;
        let page = orders
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_promotion(&self, code: &str) -> Result<Option<Promotion>, StoreError> {
        let code = normalize_code(code);
        let tables = self.tables.lock().await;
        Ok(tables.promotions.values().find(|p| p.code == code).cloned())
    }

    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
        Ok(self
            .cart(user_id)
            .await
            .into_iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64, StoreError> {
        self.side_effect_guard()?;
        let mut tables = self.tables.lock().await;
        let before = tables.carts.len();
        tables.carts.retain(|item| item.user_id != user_id);
        Ok((before - tables.carts.len()) as u64)
    }

    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        self.side_effect_guard()?;
        self.tables.lock().await.notifications.push(notification);
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn purchasable_product(
        &mut self,
        product_id: Uuid,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        Ok(self.work.products.get(&product_id).map(|p| ProductSnapshot {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            stock: p.stock,
            is_active: p.is_active,
        }))
    }

    async fn promotion_for_update(&mut self, code: &str) -> Result<Option<Promotion>, StoreError> {
        let code = normalize_code(code);
        Ok(self
            .work
            .promotions
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError> {
        self.work.orders.insert(order.id, order.clone());
        self.work.items.extend_from_slice(items);
        Ok(())
    }

    async fn reserve_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<bool, StoreError> {
        match self.work.products.get_mut(&product_id) {
            Some(p) if p.is_active && p.stock >= quantity => {
                p.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<(), StoreError> {
        if let Some(p) = self.work.products.get_mut(&product_id) {
            p.stock += quantity;
        }
        Ok(())
    }

    async fn redeem_promotion(&mut self, promotion_id: Uuid) -> Result<bool, StoreError> {
        match self.work.promotions.get_mut(&promotion_id) {
            Some(p) if p.usage_limit.is_none_or(|limit| p.usage_count < limit) => {
                p.usage_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn order_for_update(&mut self, order_id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self.work.record(order_id))
    }

    async fn save_order(&mut self, order: &Order) -> Result<(), StoreError> {
        match self.work.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::Unavailable(format!("order {} vanished", order.id))),
        }
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = self.work;
        Ok(())
    }
}
