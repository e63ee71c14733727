use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderList,
    dto::seller::{ProcessSellerRequest, SellerList, SellerRequestList, SellerStats},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{SellerRequest, User},
    response::ApiResponse,
    services::{order_service, seller_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/seller-requests", get(list_seller_requests))
        .route("/seller-requests/{id}/process", post(process_seller_request))
        .route("/sellers", get(list_sellers))
        .route("/sellers/{id}/disable", post(disable_seller))
        .route("/seller-stats", get(seller_stats))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    responses(
        (status = 200, description = "Every order, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_all_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/seller-requests",
    responses(
        (status = 200, description = "Pending onboarding requests, oldest first", body = ApiResponse<SellerRequestList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_seller_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerRequestList>>> {
    let resp = seller_service::list_pending_requests(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/seller-requests/{id}/process",
    params(
        ("id" = Uuid, Path, description = "Seller request ID")
    ),
    request_body = ProcessSellerRequest,
    responses(
        (status = 200, description = "Request approved or rejected", body = ApiResponse<SellerRequest>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Request is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn process_seller_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProcessSellerRequest>,
) -> AppResult<Json<ApiResponse<SellerRequest>>> {
    let resp = seller_service::process_request(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/sellers",
    responses(
        (status = 200, description = "Active sellers", body = ApiResponse<SellerList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_sellers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerList>>> {
    let resp = seller_service::list_sellers(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/sellers/{id}/disable",
    params(
        ("id" = Uuid, Path, description = "Seller's user ID")
    ),
    responses(
        (status = 200, description = "Seller demoted to regular user", body = ApiResponse<User>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn disable_seller(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = seller_service::disable_seller(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/seller-stats",
    responses(
        (status = 200, description = "Seller and request counts", body = ApiResponse<SellerStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn seller_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerStats>>> {
    let resp = seller_service::seller_stats(&state, &user).await?;
    Ok(Json(resp))
}
