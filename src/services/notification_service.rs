use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::notifications::NotificationList,
    entity::notifications::{Column as NotifCol, Entity as Notifications},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
    store::sea::notification_from_entity,
};

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Notifications::find()
        .filter(NotifCol::UserId.eq(user.user_id))
        .order_by_desc(NotifCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let unread = Notifications::find()
        .filter(NotifCol::UserId.eq(user.user_id))
        .filter(NotifCol::IsRead.eq(false))
        .count(&state.orm)
        .await?;

    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(notification_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items, unread },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Notifications::update_many()
        .col_expr(NotifCol::IsRead, Expr::value(true))
        .filter(NotifCol::Id.eq(id))
        .filter(NotifCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Marked as read",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}
