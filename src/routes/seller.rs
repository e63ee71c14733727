use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::seller::SubmitSellerRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::SellerRequest,
    response::ApiResponse,
    services::seller_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/requests", post(submit_request))
}

#[utoipa::path(
    post,
    path = "/api/seller/requests",
    request_body = SubmitSellerRequest,
    responses(
        (status = 200, description = "Onboarding request submitted", body = ApiResponse<SellerRequest>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Already a seller or a request is pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn submit_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitSellerRequest>,
) -> AppResult<Json<ApiResponse<SellerRequest>>> {
    let resp = seller_service::submit_request(&state, &user, payload).await?;
    Ok(Json(resp))
}
