//! Promotion evaluation.
//!
//! Gating runs in a fixed order (existence, active flag, window, usage, minimum
//! order) so the first failing check decides the reported reason.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{DiscountKind, Promotion};

/// Why a code cannot be redeemed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotFound,
    Inactive,
    NotStarted,
    Expired,
    UsageLimitReached,
    BelowMinimum { min_order: i64 },
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::NotFound => "not_found",
            RejectReason::Inactive => "inactive",
            RejectReason::NotStarted => "not_started",
            RejectReason::Expired => "expired",
            RejectReason::UsageLimitReached => "usage_limit_reached",
            RejectReason::BelowMinimum { .. } => "below_minimum",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotFound => f.write_str("promotion code does not exist"),
            RejectReason::Inactive => f.write_str("promotion is not active"),
            RejectReason::NotStarted => f.write_str("promotion has not started yet"),
            RejectReason::Expired => f.write_str("promotion has expired"),
            RejectReason::UsageLimitReached => f.write_str("promotion usage limit reached"),
            RejectReason::BelowMinimum { min_order } => {
                write!(f, "order subtotal is below the minimum of {min_order}")
            }
        }
    }
}

/// Benefit granted by a usable promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct Evaluation {
    pub discount: i64,
    pub free_shipping: bool,
}

/// Upper-cases and trims a code for storage and lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub fn evaluate(
    promotion: Option<&Promotion>,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<Evaluation, RejectReason> {
    let promotion = promotion.ok_or(RejectReason::NotFound)?;

    if !promotion.is_active {
        return Err(RejectReason::Inactive);
    }
    if promotion.starts_at.is_some_and(|start| now < start) {
        return Err(RejectReason::NotStarted);
    }
    if promotion.ends_at.is_some_and(|end| now > end) {
        return Err(RejectReason::Expired);
    }
    if promotion
        .usage_limit
        .is_some_and(|limit| promotion.usage_count >= limit)
    {
        return Err(RejectReason::UsageLimitReached);
    }
    if subtotal < promotion.min_order {
        return Err(RejectReason::BelowMinimum {
            min_order: promotion.min_order,
        });
    }

    let subtotal = subtotal.max(0);
    let evaluation = match promotion.kind {
        DiscountKind::Percentage => {
            // Integer division floors for non-negative operands.
            let raw = i128::from(subtotal) * i128::from(promotion.value.clamp(0, 100)) / 100;
            let mut discount = i64::try_from(raw).unwrap_or(i64::MAX);
            if let Some(cap) = promotion.max_discount {
                discount = discount.min(cap.max(0));
            }
            Evaluation {
                discount: discount.min(subtotal),
                free_shipping: false,
            }
        }
        DiscountKind::FixedAmount => Evaluation {
            discount: promotion.value.max(0).min(subtotal),
            free_shipping: false,
        },
        DiscountKind::FreeShipping => Evaluation {
            discount: 0,
            free_shipping: true,
        },
    };

    Ok(evaluation)
}
