//! The order ledger: checkout, cancellation and status changes.
//!
//! Every multi-record change runs inside one [`LedgerTx`]. Returning early with
//! `?` drops the transaction, which discards all of its writes. Cart clearing
//! and notifications happen after commit and only ever produce warnings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    models::{
        Notification, NotificationKind, Order, OrderItem, OrderStatus, PaymentMethod,
        PaymentStatus, ShippingAddress,
    },
    store::{LedgerStore, LedgerTx, OrderFilter, OrderRecord, ProductSnapshot},
};

pub mod error;
pub mod pricing;
pub mod promotion;
pub mod status;

pub use error::LedgerError;
pub use pricing::{ShippingPolicy, Totals};
pub use promotion::{Evaluation, RejectReason};

/// Who is acting on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    fn can_access(&self, order: &Order) -> bool {
        self.is_admin || order.user_id == self.user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub promotion_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub lines: Vec<LineRequest>,
    pub details: CheckoutDetails,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

/// Result of a committed change plus any side effects that did not go through.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub record: OrderRecord,
    pub warnings: Vec<String>,
}

pub struct Ledger<S> {
    store: S,
    shipping: ShippingPolicy,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, shipping: ShippingPolicy) -> Self {
        Self { store, shipping }
    }

    #[tracing::instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: PlaceOrder,
    ) -> Result<Receipt, LedgerError> {
        validate_request(&request)?;
        let PlaceOrder { lines, details } = request;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        let mut priced: Vec<(ProductSnapshot, i32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = tx
                .purchasable_product(line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or(LedgerError::ProductNotFound(line.product_id))?;
            if product.stock < line.quantity {
                return Err(LedgerError::OutOfStock(product.id));
            }
            priced.push((product, line.quantity));
        }

        let subtotal = pricing::subtotal(priced.iter().map(|(p, qty)| (p.price, *qty)))?;

        let code = details
            .promotion_code
            .as_deref()
            .map(promotion::normalize_code)
            .filter(|code| !code.is_empty());
        let (applied, benefit) = match code.as_deref() {
            Some(code) => {
                let found = tx.promotion_for_update(code).await?;
                let benefit = promotion::evaluate(found.as_ref(), subtotal, now)
                    .map_err(LedgerError::InvalidPromotion)?;
                (found, benefit)
            }
            None => (None, Evaluation::default()),
        };

        let shipping_fee = self.shipping.fee_for(subtotal, benefit.free_shipping);
        let totals = Totals::compute(subtotal, benefit.discount, shipping_fee)?;

        let order_id = Uuid::new_v4();
        let order = Order {
            id: order_id,
            order_number: order_number(order_id, now),
            user_id,
            status: OrderStatus::Pending,
            payment_method: details.payment_method,
            payment_status: PaymentStatus::Pending,
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_fee: totals.shipping_fee,
            total: totals.total,
            promotion_code: applied.as_ref().map(|p| p.code.clone()),
            shipping_address: details.shipping_address,
            notes: details
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            tracking_number: None,
            paid_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = priced
            .into_iter()
            .map(|(product, quantity)| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: product.id,
                product_name: product.name,
                quantity,
                unit_price: product.price,
                created_at: now,
            })
            .collect();

        tx.insert_order(&order, &items).await?;

        for (product_id, quantity) in stock_moves(&items)? {
            if !tx.reserve_stock(product_id, quantity).await? {
                tracing::debug!(product_id = %product_id, "stock taken by a concurrent order");
                return Err(LedgerError::OutOfStock(product_id));
            }
        }

        if let Some(promo) = &applied {
            if !tx.redeem_promotion(promo.id).await? {
                return Err(LedgerError::InvalidPromotion(RejectReason::UsageLimitReached));
            }
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = order.total,
            "order created"
        );

        let mut warnings = Vec::new();
        if let Err(err) = self.store.clear_cart(user_id).await {
            tracing::warn!(error = %err, order_id = %order.id, "clearing cart failed");
            warnings.push(format!("cart was not cleared: {err}"));
        }
        warnings.extend(self.notify(&order, NotificationKind::OrderCreated).await);

        Ok(Receipt {
            record: OrderRecord { order, items },
            warnings,
        })
    }

    /// Places an order for everything in the user's cart.
    pub async fn checkout_cart(
        &self,
        user_id: Uuid,
        details: CheckoutDetails,
    ) -> Result<Receipt, LedgerError> {
        let lines = self
            .store
            .cart_lines(user_id)
            .await?
            .into_iter()
            .map(|line| LineRequest {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect();
        self.create_order(user_id, PlaceOrder { lines, details }).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, actor: Actor, order_id: Uuid) -> Result<Receipt, LedgerError> {
        let mut tx = self.store.begin().await?;
        let OrderRecord { mut order, items } = tx
            .order_for_update(order_id)
            .await?
            .filter(|record| actor.can_access(&record.order))
            .ok_or(LedgerError::NotFound)?;

        order.status.check_transition(OrderStatus::Cancelled)?;

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        if order.payment_status == PaymentStatus::Paid {
            order.payment_status = PaymentStatus::Refunded;
        }
        tx.save_order(&order).await?;

        // Promotion usage stays consumed.
        for (product_id, quantity) in stock_moves(&items)? {
            tx.release_stock(product_id, quantity).await?;
        }

        tx.commit().await?;
        tracing::info!(order_id = %order.id, by_admin = actor.is_admin, "order cancelled");

        let warnings = self
            .notify(&order, NotificationKind::OrderCancelled)
            .await
            .into_iter()
            .collect();
        Ok(Receipt {
            record: OrderRecord { order, items },
            warnings,
        })
    }

    /// Admin-driven status change. Cancelling goes through [`Ledger::cancel_order`]
    /// so stock is restored.
    #[tracing::instrument(skip(self, change), fields(status = change.status.as_str()))]
    pub async fn update_status(
        &self,
        actor: Actor,
        order_id: Uuid,
        change: StatusChange,
    ) -> Result<Receipt, LedgerError> {
        if !actor.is_admin {
            return Err(LedgerError::Unauthorized);
        }
        if change.status == OrderStatus::Cancelled {
            return self.cancel_order(actor, order_id).await;
        }

        let mut tx = self.store.begin().await?;
        let OrderRecord { mut order, items } = tx
            .order_for_update(order_id)
            .await?
            .ok_or(LedgerError::NotFound)?;

        order.status.check_transition(change.status)?;

        let now = Utc::now();
        order.status = change.status;
        order.updated_at = now;
        if change.status == OrderStatus::Delivered {
            order.delivered_at = Some(now);
        }
        if let Some(tracking) = change
            .tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
        {
            order.tracking_number = Some(tracking);
        }
        tx.save_order(&order).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, status = order.status.as_str(), "order status updated");

        let warnings = self
            .notify(&order, NotificationKind::OrderStatus)
            .await
            .into_iter()
            .collect();
        Ok(Receipt {
            record: OrderRecord { order, items },
            warnings,
        })
    }

    /// Marks the order paid. A pending order moves to confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(
        &self,
        actor: Actor,
        order_id: Uuid,
    ) -> Result<Receipt, LedgerError> {
        let mut tx = self.store.begin().await?;
        let OrderRecord { mut order, items } = tx
            .order_for_update(order_id)
            .await?
            .filter(|record| actor.can_access(&record.order))
            .ok_or(LedgerError::NotFound)?;

        if order.status == OrderStatus::Cancelled {
            return Err(LedgerError::PaymentRejected("order is cancelled"));
        }
        if order.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::PaymentRejected("order is already paid"));
        }

        let now = Utc::now();
        order.payment_status = PaymentStatus::Paid;
        order.paid_at = Some(now);
        order.updated_at = now;
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Confirmed;
        }
        tx.save_order(&order).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, "payment recorded");

        let warnings = self
            .notify(&order, NotificationKind::PaymentReceived)
            .await
            .into_iter()
            .collect();
        Ok(Receipt {
            record: OrderRecord { order, items },
            warnings,
        })
    }

    pub async fn get_order(&self, actor: Actor, order_id: Uuid) -> Result<OrderRecord, LedgerError> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|record| actor.can_access(&record.order))
            .ok_or(LedgerError::NotFound)
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<(Vec<Order>, u64), LedgerError> {
        Ok(self.store.list_orders(filter).await?)
    }

    /// Evaluates a code without consuming a use. The outer error is a store
    /// failure, the inner one the reason the code would be refused.
    pub async fn preview_promotion(
        &self,
        code: &str,
        subtotal: i64,
    ) -> Result<Result<Evaluation, RejectReason>, LedgerError> {
        let found = self.store.find_promotion(code).await?;
        Ok(promotion::evaluate(found.as_ref(), subtotal, Utc::now()))
    }

    async fn notify(&self, order: &Order, kind: NotificationKind) -> Option<String> {
        let (title, message) = match kind {
            NotificationKind::PaymentReceived => (
                "Payment received".to_string(),
                format!("We received the payment for order {}.", order.order_number),
            ),
            _ => order.status.customer_message(&order.order_number),
        };
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            order_id: Some(order.id),
            kind,
            title,
            message,
            is_read: false,
            created_at: Utc::now(),
        };

        match self.store.notify(notification).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(error = %err, order_id = %order.id, "notification failed");
                Some(format!("notification was not sent: {err}"))
            }
        }
    }
}

fn validate_request(request: &PlaceOrder) -> Result<(), LedgerError> {
    if request.lines.is_empty() {
        return Err(LedgerError::EmptyOrder);
    }
    if let Some(line) = request.lines.iter().find(|line| line.quantity <= 0) {
        return Err(LedgerError::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity,
        });
    }

    let address = &request.details.shipping_address;
    for (field, value) in [
        ("recipient_name", &address.recipient_name),
        ("phone", &address.phone),
        ("address_line", &address.address_line),
        ("city", &address.city),
    ] {
        if value.trim().is_empty() {
            return Err(LedgerError::Validation(format!(
                "shipping_address.{field} is required"
            )));
        }
    }
    Ok(())
}

/// Quantity per product, ascending by product id. Every transaction touches
/// product rows in this order so their row locks cannot wait on each other in
/// a cycle.
fn stock_moves(items: &[OrderItem]) -> Result<Vec<(Uuid, i32)>, LedgerError> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in items {
        let total = merged.entry(item.product_id).or_insert(0);
        *total = total
            .checked_add(item.quantity)
            .ok_or(LedgerError::AmountOverflow)?;
    }
    Ok(merged.into_iter().collect())
}

/// Derived from the order id, so unique whenever the id is.
fn order_number(order_id: Uuid, now: DateTime<Utc>) -> String {
    format!(
        "GH-{}-{}",
        now.format("%Y%m%d"),
        order_id.simple().to_string().to_uppercase()
    )
}
