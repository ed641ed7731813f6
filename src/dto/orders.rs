use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    ledger::{CheckoutDetails, LineRequest, PlaceOrder},
    models::{Order, OrderItem, PaymentMethod, ShippingAddress},
    store::OrderRecord,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineInput>,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub promotion_code: Option<String>,
}

/// Checkout of the current cart; lines come from the cart itself.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub promotion_code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of pending, confirmed, shipping (or processing), delivered, cancelled.
    pub status: String,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

impl From<OrderRecord> for OrderWithItems {
    fn from(record: OrderRecord) -> Self {
        Self {
            order: record.order,
            items: record.items,
        }
    }
}

impl From<CheckoutRequest> for CheckoutDetails {
    fn from(req: CheckoutRequest) -> Self {
        Self {
            payment_method: req.payment_method,
            shipping_address: req.shipping_address,
            notes: req.notes,
            promotion_code: req.promotion_code,
        }
    }
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(req: CreateOrderRequest) -> Self {
        Self {
            lines: req
                .items
                .into_iter()
                .map(|line| LineRequest {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
            details: CheckoutDetails {
                payment_method: req.payment_method,
                shipping_address: req.shipping_address,
                notes: req.notes,
                promotion_code: req.promotion_code,
            },
        }
    }
}
