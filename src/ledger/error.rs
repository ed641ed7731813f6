use thiserror::Error;
use uuid::Uuid;

use crate::{models::OrderStatus, store::StoreError};

use super::promotion::RejectReason;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("order must contain at least one item")]
    EmptyOrder,

    #[error("quantity for product {product_id} must be greater than 0")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("insufficient stock for product {0}")]
    OutOfStock(Uuid),

    #[error("invalid promotion: {0}")]
    InvalidPromotion(RejectReason),

    #[error("order cannot be cancelled while {}", .0.as_str())]
    NotCancellable(OrderStatus),

    #[error("cannot move order from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("payment rejected: {0}")]
    PaymentRejected(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("admin rights required")]
    Unauthorized,

    #[error("order amount out of range")]
    AmountOverflow,

    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::EmptyOrder => "empty_order",
            LedgerError::InvalidQuantity { .. } => "invalid_quantity",
            LedgerError::ProductNotFound(_) => "product_not_found",
            LedgerError::OutOfStock(_) => "out_of_stock",
            LedgerError::InvalidPromotion(_) => "invalid_promotion",
            LedgerError::NotCancellable(_) => "not_cancellable",
            LedgerError::InvalidTransition { .. } => "invalid_transition",
            LedgerError::PaymentRejected(_) => "payment_rejected",
            LedgerError::Validation(_) => "validation",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::AmountOverflow => "amount_overflow",
            LedgerError::NotFound => "not_found",
            LedgerError::Store(_) => "internal",
        }
    }
}
