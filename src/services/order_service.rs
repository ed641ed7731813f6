use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    ledger::{Receipt, StatusChange},
    middleware::auth::{AuthUser, ensure_admin},
    models::OrderStatus,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
    store::OrderFilter,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status: query.status,
        oldest_first: matches!(query.sort_order, Some(SortOrder::Asc)),
        limit,
        offset,
    };

    let (orders, total) = state.ledger.list_orders(&filter).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let receipt = state.ledger.create_order(user.user_id, payload.into()).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({
            "order_id": receipt.record.order.id,
            "total": receipt.record.order.total,
            "promotion_code": receipt.record.order.promotion_code,
        }),
    )
    .await;

    Ok(with_receipt("Order created", receipt))
}

pub async fn checkout_cart(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let receipt = state
        .ledger
        .checkout_cart(user.user_id, payload.into())
        .await?;

    audit::record(
        &state.orm,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({ "order_id": receipt.record.order.id }),
    )
    .await;

    Ok(with_receipt("Checkout success", receipt))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let record = state.ledger.get_order(user.actor(), id).await?;
    Ok(ApiResponse::success(
        "OK",
        OrderWithItems::from(record),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let receipt = state.ledger.cancel_order(user.actor(), id).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(with_receipt("Order cancelled", receipt))
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let receipt = state.ledger.record_payment(user.actor(), id).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(with_receipt("Payment recorded", receipt))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest("Invalid order status".into()))?;

    let change = StatusChange {
        status,
        tracking_number: payload.tracking_number,
    };
    let receipt = state.ledger.update_status(user.actor(), id, change).await?;

    audit::record(
        &state.orm,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": id, "status": status.as_str() }),
    )
    .await;

    Ok(with_receipt("Order updated", receipt))
}

fn with_receipt(message: &str, receipt: Receipt) -> ApiResponse<OrderWithItems> {
    let Receipt { record, warnings } = receipt;
    ApiResponse::success(
        message,
        OrderWithItems::from(record),
        Some(Meta::with_warnings(warnings)),
    )
}
