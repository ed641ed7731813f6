use crate::models::OrderStatus;

use super::error::LedgerError;

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a wire value, accepting `processing` as an alias of `shipping`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipping" | "processing" => Some(OrderStatus::Shipping),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Position on the forward path. `Cancelled` sits off the path.
    const fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Shipping => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    pub const fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    /// Validates a move to `next`: forward along the path, or into `Cancelled`
    /// from a cancellable state.
    pub fn check_transition(self, next: OrderStatus) -> Result<(), LedgerError> {
        if next == OrderStatus::Cancelled {
            return if self.is_cancellable() {
                Ok(())
            } else {
                Err(LedgerError::NotCancellable(self))
            };
        }

        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) if to > from => Ok(()),
            _ => Err(LedgerError::InvalidTransition {
                from: self,
                to: next,
            }),
        }
    }

    /// Title and body of the customer notification sent on entering this status.
    pub fn customer_message(self, order_number: &str) -> (String, String) {
        let (title, body) = match self {
            OrderStatus::Pending => (
                "Order placed",
                format!("We received your order {order_number} and will confirm it shortly."),
            ),
            OrderStatus::Confirmed => (
                "Order confirmed",
                format!("Your order {order_number} has been confirmed and is being prepared."),
            ),
            OrderStatus::Shipping => (
                "Order on its way",
                format!("Your order {order_number} has been handed to the carrier."),
            ),
            OrderStatus::Delivered => (
                "Order delivered",
                format!("Your order {order_number} has been delivered. Enjoy your gift!"),
            ),
            OrderStatus::Cancelled => (
                "Order cancelled",
                format!("Your order {order_number} has been cancelled."),
            ),
        };
        (title.to_string(), body)
    }
}
