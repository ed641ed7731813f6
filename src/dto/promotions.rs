use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    ledger::{Evaluation, RejectReason},
    models::{DiscountKind, Promotion},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub code: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    #[serde(default)]
    pub value: i64,
    pub max_discount: Option<i64>,
    pub min_order: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePromotionRequest {
    pub is_active: Option<bool>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePromotionRequest {
    pub code: String,
    pub subtotal: i64,
}

/// Outcome of checking a code against a subtotal.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionCheck {
    pub code: String,
    pub usable: bool,
    pub discount: i64,
    pub free_shipping: bool,
    pub reason_code: Option<String>,
    pub reason: Option<String>,
}

impl PromotionCheck {
    pub fn new(code: String, outcome: Result<Evaluation, RejectReason>) -> Self {
        match outcome {
            Ok(eval) => Self {
                code,
                usable: true,
                discount: eval.discount,
                free_shipping: eval.free_shipping,
                reason_code: None,
                reason: None,
            },
            Err(reason) => Self {
                code,
                usable: false,
                discount: 0,
                free_shipping: false,
                reason_code: Some(reason.code().to_string()),
                reason: Some(reason.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionList {
    pub items: Vec<Promotion>,
}
