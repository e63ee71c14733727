use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::seller::{
        ProcessSellerRequest, SellerDecision, SellerList, SellerRequestList, SellerStats,
        SubmitSellerRequest,
    },
    entity::{
        seller_requests::{
            ActiveModel as RequestActive, Column as RequestCol, Entity as SellerRequests,
            Model as RequestModel,
        },
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Role, SellerRequest, User},
    response::{ApiResponse, Meta},
    services::notification_service,
    state::AppState,
};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_REJECTED: &str = "rejected";

/// Open a seller application. A user may hold at most one pending request;
/// a rejected request can be resubmitted as a new pending one.
pub async fn submit_request(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitSellerRequest,
) -> AppResult<ApiResponse<SellerRequest>> {
    if user.role == Role::Seller {
        return Err(AppError::Conflict("You are already a seller".into()));
    }
    if payload.shop_name.trim().is_empty() {
        return Err(AppError::BadRequest("shop_name must not be empty".into()));
    }

    let pending = SellerRequests::find()
        .filter(
            Condition::all()
                .add(RequestCol::UserId.eq(user.user_id))
                .add(RequestCol::Status.eq(STATUS_PENDING)),
        )
        .one(&state.orm)
        .await?;
    if pending.is_some() {
        return Err(AppError::Conflict(
            "A pending seller request already exists".into(),
        ));
    }

    let request = RequestActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        shop_name: Set(payload.shop_name),
        shop_description: Set(payload.shop_description),
        address: Set(payload.address),
        avatar_url: Set(payload.avatar_url),
        status: Set(STATUS_PENDING.to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "seller_request_submit",
        Some("seller_requests"),
        Some(serde_json::json!({ "request_id": request.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Seller request submitted",
        request_from_entity(request),
        Some(Meta::empty()),
    ))
}

pub async fn list_pending_requests(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SellerRequestList>> {
    ensure_admin(user)?;
    let items = SellerRequests::find()
        .filter(RequestCol::Status.eq(STATUS_PENDING))
        .order_by_asc(RequestCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(request_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Pending seller requests",
        SellerRequestList { items },
        Some(Meta::empty()),
    ))
}

/// Approve or reject a pending request. Approval copies the shop fields onto
/// the user, promotes the role, and notifies the applicant.
pub async fn process_request(
    state: &AppState,
    user: &AuthUser,
    request_id: Uuid,
    payload: ProcessSellerRequest,
) -> AppResult<ApiResponse<SellerRequest>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;

    let request = SellerRequests::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Seller request"))?;

    if request.status != STATUS_PENDING {
        return Err(AppError::Conflict(
            "Seller request has already been processed".into(),
        ));
    }

    let applicant_id = request.user_id;
    let (new_status, approved) = match payload.decision {
        SellerDecision::Approved => (STATUS_APPROVED, true),
        SellerDecision::Rejected => (STATUS_REJECTED, false),
    };

    let mut active: RequestActive = request.clone().into();
    active.status = Set(new_status.to_string());
    let request = active.update(&txn).await?;

    if approved {
        let applicant = Users::find_by_id(applicant_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        let mut applicant: UserActive = applicant.into();
        applicant.role = Set(Role::Seller.as_str().to_string());
        applicant.shop_name = Set(request.shop_name.clone());
        applicant.shop_description = Set(request.shop_description.clone());
        applicant.address = Set(request.address.clone());
        applicant.shop_avatar = Set(request.avatar_url.clone());
        applicant.update(&txn).await?;

        notification_service::notify(
            &txn,
            applicant_id,
            "Your seller request has been approved".to_string(),
        )
        .await?;
    } else {
        notification_service::notify(
            &txn,
            applicant_id,
            "Your seller request has been rejected".to_string(),
        )
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "seller_request_process",
        Some("seller_requests"),
        Some(serde_json::json!({ "request_id": request.id, "status": new_status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        format!("Seller request {new_status}"),
        request_from_entity(request),
        Some(Meta::empty()),
    ))
}

/// Demote a seller back to a regular user. Shop fields and products are
/// kept.
pub async fn disable_seller(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;

    let seller = Users::find_by_id(seller_id)
        .one(&state.orm)
        .await?
        .filter(|u| u.role == Role::Seller.as_str())
        .ok_or(AppError::NotFound("Seller"))?;

    let mut active: UserActive = seller.into();
    active.role = Set(Role::User.as_str().to_string());
    let seller = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "seller_disable",
        Some("users"),
        Some(serde_json::json!({ "seller_id": seller_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Seller account disabled",
        user_from_entity(seller),
        Some(Meta::empty()),
    ))
}

pub async fn list_sellers(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SellerList>> {
    ensure_admin(user)?;
    let items = Users::find()
        .filter(UserCol::Role.eq(Role::Seller.as_str()))
        .order_by_asc(UserCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Sellers",
        SellerList { items },
        Some(Meta::empty()),
    ))
}

pub async fn seller_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SellerStats>> {
    ensure_admin(user)?;
    let total_sellers = Users::find()
        .filter(UserCol::Role.eq(Role::Seller.as_str()))
        .count(&state.orm)
        .await? as i64;
    let pending_requests = SellerRequests::find()
        .filter(RequestCol::Status.eq(STATUS_PENDING))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "Seller stats",
        SellerStats {
            total_sellers,
            pending_requests,
        },
        Some(Meta::empty()),
    ))
}

fn request_from_entity(model: RequestModel) -> SellerRequest {
    SellerRequest {
        id: model.id,
        user_id: model.user_id,
        shop_name: model.shop_name,
        shop_description: model.shop_description,
        address: model.address,
        avatar_url: model.avatar_url,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        address: model.address,
        role: model.role,
        shop_name: model.shop_name,
        shop_description: model.shop_description,
        shop_avatar: model.shop_avatar,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
