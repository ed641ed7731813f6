use super::error::LedgerError;

/// Flat shipping fee, waived at or above `free_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_fee: i64,
    pub free_threshold: i64,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: 30_000,
            free_threshold: 500_000,
        }
    }
}

impl ShippingPolicy {
    pub fn fee_for(&self, subtotal: i64, waived: bool) -> i64 {
        if waived || subtotal >= self.free_threshold {
            0
        } else {
            self.flat_fee
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping_fee: i64,
    pub total: i64,
}

impl Totals {
    /// `total = max(0, subtotal - discount) + shipping_fee`
    pub fn compute(subtotal: i64, discount: i64, shipping_fee: i64) -> Result<Self, LedgerError> {
        let discounted = subtotal.saturating_sub(discount).max(0);
        let total = discounted
            .checked_add(shipping_fee)
            .ok_or(LedgerError::AmountOverflow)?;
        Ok(Self {
            subtotal,
            discount,
            shipping_fee,
            total,
        })
    }
}

/// Sum of `price * quantity` over all lines.
pub fn subtotal<I>(lines: I) -> Result<i64, LedgerError>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines.into_iter().try_fold(0_i64, |acc, (price, quantity)| {
        price
            .checked_mul(i64::from(quantity))
            .and_then(|line| acc.checked_add(line))
            .ok_or(LedgerError::AmountOverflow)
    })
}
