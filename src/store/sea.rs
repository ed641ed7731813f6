use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        notifications::{self, ActiveModel as NotificationActive},
        order_items::{self, ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{self, Column as ProdCol, Entity as Products},
        promotions::{self, Column as PromoCol, Entity as Promotions},
    },
    ledger::promotion::normalize_code,
    models::{CartItem, Notification, Order, OrderItem, Product, Promotion},
};

use super::{
    CartLine, LedgerStore, LedgerTx, OrderFilter, OrderRecord, ProductSnapshot, StoreError,
};

/// Store backed by a pooled sea-orm connection.
#[derive(Clone)]
pub struct SeaOrmStore {
    conn: DatabaseConnection,
}

pub struct SeaOrmTx {
    txn: DatabaseTransaction,
}

impl SeaOrmStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl LedgerStore for SeaOrmStore {
    type Tx = SeaOrmTx;

    async fn begin(&self) -> Result<SeaOrmTx, StoreError> {
        let txn = self.conn.begin().await?;
        Ok(SeaOrmTx { txn })
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        let Some(order) = Orders::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .order_by_asc(OrderItemCol::Id)
            .all(&self.conn)
            .await?;
        record_from_entities(order, items).map(Some)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64), StoreError> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status));
        }

        let mut finder = Orders::find().filter(condition);
        finder = if filter.oldest_first {
            finder.order_by_asc(OrderCol::CreatedAt)
        } else {
            finder.order_by_desc(OrderCol::CreatedAt)
        };

        let total = finder.clone().count(&self.conn).await?;

        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((orders, total))
    }

    async fn find_promotion(&self, code: &str) -> Result<Option<Promotion>, StoreError> {
        let promotion = Promotions::find()
            .filter(PromoCol::Code.eq(normalize_code(code)))
            .one(&self.conn)
            .await?;
        Ok(promotion.map(promotion_from_entity))
    }

    async fn cart_lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
        let lines = CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .order_by_asc(CartCol::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();
        Ok(lines)
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn notify(&self, notification: Notification) -> Result<(), StoreError> {
        NotificationActive {
            id: Set(notification.id),
            user_id: Set(notification.user_id),
            order_id: Set(notification.order_id),
            kind: Set(notification.kind),
            title: Set(notification.title),
            message: Set(notification.message),
            is_read: Set(notification.is_read),
            created_at: Set(notification.created_at.into()),
        }
        .insert(&self.conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for SeaOrmTx {
    async fn purchasable_product(
        &mut self,
        product_id: Uuid,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let product = Products::find_by_id(product_id).one(&self.txn).await?;
        Ok(product.map(|p| ProductSnapshot {
            id: p.id,
            name: p.name,
            price: p.price,
            stock: p.stock,
            is_active: p.is_active,
        }))
    }

    async fn promotion_for_update(&mut self, code: &str) -> Result<Option<Promotion>, StoreError> {
        let promotion = Promotions::find()
            .filter(PromoCol::Code.eq(normalize_code(code)))
            .lock(LockType::Update)
            .one(&self.txn)
            .await?;
        Ok(promotion.map(promotion_from_entity))
    }

    async fn insert_order(&mut self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError> {
        order_active(order)?.insert(&self.txn).await?;
        if !items.is_empty() {
            OrderItems::insert_many(items.iter().map(order_item_active))
                .exec(&self.txn)
                .await?;
        }
        Ok(())
    }

    async fn reserve_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<bool, StoreError> {
        // Check and decrement in one statement so concurrent checkouts cannot
        // both take the last units.
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .filter(ProdCol::IsActive.eq(true))
            .filter(ProdCol::Stock.gte(quantity))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn release_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<(), StoreError> {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .exec(&self.txn)
            .await?;
        Ok(())
    }

    async fn redeem_promotion(&mut self, promotion_id: Uuid) -> Result<bool, StoreError> {
        let result = Promotions::update_many()
            .col_expr(PromoCol::UsageCount, Expr::col(PromoCol::UsageCount).add(1))
            .filter(PromoCol::Id.eq(promotion_id))
            .filter(
                Condition::any()
                    .add(PromoCol::UsageLimit.is_null())
                    .add(Expr::col(PromoCol::UsageCount).lt(Expr::col(PromoCol::UsageLimit))),
            )
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn order_for_update(&mut self, order_id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        let Some(order) = Orders::find_by_id(order_id)
            .lock(LockType::Update)
            .one(&self.txn)
            .await?
        else {
            return Ok(None);
        };
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .order_by_asc(OrderItemCol::Id)
            .all(&self.txn)
            .await?;
        record_from_entities(order, items).map(Some)
    }

    async fn save_order(&mut self, order: &Order) -> Result<(), StoreError> {
        order_active(order)?.update(&self.txn).await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await?;
        Ok(())
    }
}

fn order_active(order: &Order) -> Result<OrderActive, StoreError> {
    Ok(OrderActive {
        id: Set(order.id),
        order_number: Set(order.order_number.clone()),
        user_id: Set(order.user_id),
        status: Set(order.status),
        payment_method: Set(order.payment_method),
        payment_status: Set(order.payment_status),
        subtotal: Set(order.subtotal),
        discount: Set(order.discount),
        shipping_fee: Set(order.shipping_fee),
        total: Set(order.total),
        promotion_code: Set(order.promotion_code.clone()),
        shipping_address: Set(serde_json::to_value(&order.shipping_address)?),
        notes: Set(order.notes.clone()),
        tracking_number: Set(order.tracking_number.clone()),
        paid_at: Set(order.paid_at.map(Into::into)),
        delivered_at: Set(order.delivered_at.map(Into::into)),
        created_at: Set(order.created_at.into()),
        updated_at: Set(order.updated_at.into()),
    })
}

fn order_item_active(item: &OrderItem) -> OrderItemActive {
    OrderItemActive {
        id: Set(item.id),
        order_id: Set(item.order_id),
        product_id: Set(item.product_id),
        product_name: Set(item.product_name.clone()),
        quantity: Set(item.quantity),
        unit_price: Set(item.unit_price),
        created_at: Set(item.created_at.into()),
    }
}

fn record_from_entities(
    order: orders::Model,
    items: Vec<order_items::Model>,
) -> Result<OrderRecord, StoreError> {
    Ok(OrderRecord {
        order: order_from_entity(order)?,
        items: items.into_iter().map(order_item_from_entity).collect(),
    })
}

pub(crate) fn order_from_entity(model: orders::Model) -> Result<Order, StoreError> {
    Ok(Order {
        id: model.id,
        order_number: model.order_number,
        user_id: model.user_id,
        status: model.status,
        payment_method: model.payment_method,
        payment_status: model.payment_status,
        subtotal: model.subtotal,
        discount: model.discount,
        shipping_fee: model.shipping_fee,
        total: model.total,
        promotion_code: model.promotion_code,
        shipping_address: serde_json::from_value(model.shipping_address)?,
        notes: model.notes,
        tracking_number: model.tracking_number,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: order_items::Model) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn promotion_from_entity(model: promotions::Model) -> Promotion {
    Promotion {
        id: model.id,
        code: model.code,
        description: model.description,
        kind: model.kind,
        value: model.value,
        max_discount: model.max_discount,
        min_order: model.min_order,
        starts_at: model.starts_at.map(|dt| dt.with_timezone(&Utc)),
        ends_at: model.ends_at.map(|dt| dt.with_timezone(&Utc)),
        usage_limit: model.usage_limit,
        usage_count: model.usage_count,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn cart_item_from_entity(model: cart_items::Model) -> CartItem {
    CartItem {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn notification_from_entity(model: notifications::Model) -> Notification {
    Notification {
        id: model.id,
        user_id: model.user_id,
        order_id: model.order_id,
        kind: model.kind,
        title: model.title,
        message: model.message,
        is_read: model.is_read,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
