use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::promotions::{
        CreatePromotionRequest, PromotionCheck, PromotionList, UpdatePromotionRequest,
        ValidatePromotionRequest,
    },
    entity::promotions::{ActiveModel as PromotionActive, Column as PromoCol, Entity as Promotions},
    error::{AppError, AppResult},
    ledger::promotion::normalize_code,
    middleware::auth::{AuthUser, ensure_admin},
    models::{DiscountKind, Promotion},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
    store::sea::promotion_from_entity,
};

/// Reports what a code would be worth without consuming a use.
pub async fn validate_code(
    state: &AppState,
    payload: ValidatePromotionRequest,
) -> AppResult<ApiResponse<PromotionCheck>> {
    if payload.subtotal < 0 {
        return Err(AppError::BadRequest("subtotal must not be negative".into()));
    }
    let code = normalize_code(&payload.code);
    let outcome = state
        .ledger
        .preview_promotion(&code, payload.subtotal)
        .await?;
    Ok(ApiResponse::success(
        "Promotion checked",
        PromotionCheck::new(code, outcome),
        Some(Meta::empty()),
    ))
}

pub async fn list_promotions(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PromotionList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Promotions::find().order_by_desc(PromoCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(promotion_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Promotions",
        PromotionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_promotion(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_admin(user)?;
    validate_new_promotion(&payload).map_err(AppError::BadRequest)?;

    let code = normalize_code(&payload.code);
    let taken = Promotions::find()
        .filter(PromoCol::Code.eq(code.clone()))
        .count(&state.orm)
        .await?;
    if taken > 0 {
        return Err(AppError::BadRequest(format!(
            "promotion code {code} already exists"
        )));
    }

    let value = match payload.kind {
        DiscountKind::FreeShipping => 0,
        _ => payload.value,
    };
    let promotion = PromotionActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        description: Set(payload.description),
        kind: Set(payload.kind),
        value: Set(value),
        max_discount: Set(payload.max_discount),
        min_order: Set(payload.min_order.unwrap_or(0)),
        starts_at: Set(payload.starts_at.map(Into::into)),
        ends_at: Set(payload.ends_at.map(Into::into)),
        usage_limit: Set(payload.usage_limit),
        usage_count: Set(0),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "promotion_create",
        "promotions",
        serde_json::json!({ "promotion_id": promotion.id, "code": promotion.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion created",
        promotion_from_entity(promotion),
        Some(Meta::empty()),
    ))
}

pub async fn update_promotion(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePromotionRequest,
) -> AppResult<ApiResponse<Promotion>> {
    ensure_admin(user)?;
    let existing = Promotions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(limit) = payload.usage_limit {
        if limit <= 0 {
            return Err(AppError::BadRequest("usage_limit must be positive".into()));
        }
    }
    if let (Some(end), Some(start)) = (payload.ends_at, existing.starts_at) {
        if end <= start {
            return Err(AppError::BadRequest("ends_at must be after starts_at".into()));
        }
    }

    let mut active: PromotionActive = existing.into();
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(ends_at) = payload.ends_at {
        active.ends_at = Set(Some(ends_at.into()));
    }
    if let Some(limit) = payload.usage_limit {
        active.usage_limit = Set(Some(limit));
    }
    let promotion = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "promotion_update",
        "promotions",
        serde_json::json!({ "promotion_id": promotion.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Promotion updated",
        promotion_from_entity(promotion),
        Some(Meta::empty()),
    ))
}

fn validate_new_promotion(req: &CreatePromotionRequest) -> Result<(), String> {
    if normalize_code(&req.code).is_empty() {
        return Err("code is required".into());
    }
    match req.kind {
        DiscountKind::Percentage if !(1..=100).contains(&req.value) => {
            return Err("percentage value must be between 1 and 100".into());
        }
        DiscountKind::FixedAmount if req.value <= 0 => {
            return Err("fixed amount value must be positive".into());
        }
        _ => {}
    }
    if req.max_discount.is_some_and(|cap| cap < 0) || req.min_order.is_some_and(|min| min < 0) {
        return Err("amounts must not be negative".into());
    }
    if req.usage_limit.is_some_and(|limit| limit <= 0) {
        return Err("usage_limit must be positive".into());
    }
    if let (Some(start), Some(end)) = (req.starts_at, req.ends_at) {
        if end <= start {
            return Err("ends_at must be after starts_at".into());
        }
    }
    Ok(())
}
