use axum::{
    Json, Router,
    extract::State,
    routing::post,
};

use crate::{
    dto::promotions::{PromotionCheck, ValidatePromotionRequest},
    error::AppResult,
    response::ApiResponse,
    services::promotion_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_promotion))
}

#[utoipa::path(
    post,
    path = "/api/promotions/validate",
    request_body = ValidatePromotionRequest,
    responses(
        (status = 200, description = "Whether the code applies to the subtotal, and its benefit", body = ApiResponse<PromotionCheck>),
    ),
    tag = "Promotions"
)]
pub async fn validate_promotion(
    State(state): State<AppState>,
    Json(payload): Json<ValidatePromotionRequest>,
) -> AppResult<Json<ApiResponse<PromotionCheck>>> {
    let resp = promotion_service::validate_code(&state, payload).await?;
    Ok(Json(resp))
}
