use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    dto::notifications::NotificationList,
    entity::notifications::{
        ActiveModel as NotificationActive, Column as NotificationCol, Entity as Notifications,
        Model as NotificationModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    state::AppState,
};

const LIST_LIMIT: u64 = 50;
const DEFAULT_CLEAR_AGE_DAYS: i64 = 30;

/// Record a notification. Persistence only; delivery is someone else's
/// problem. Generic over the connection so it can ride along in checkout
/// and approval transactions.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    content: String,
) -> AppResult<NotificationModel> {
    let model = NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        content: Set(content),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(model)
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<NotificationList>> {
    let items = Notifications::find()
        .filter(NotificationCol::UserId.eq(user.user_id))
        .order_by_desc(NotificationCol::CreatedAt)
        .limit(LIST_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(notification_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(Meta::empty()),
    ))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(id)
        .filter(NotificationCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Notification"))?;

    let mut active: NotificationActive = notification.into();
    active.is_read = Set(true);
    let notification = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Marked as read",
        notification_from_entity(notification),
        Some(Meta::empty()),
    ))
}

pub async fn mark_all_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    Notifications::update_many()
        .col_expr(NotificationCol::IsRead, Expr::value(true))
        .filter(
            Condition::all()
                .add(NotificationCol::UserId.eq(user.user_id))
                .add(NotificationCol::IsRead.eq(false)),
        )
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "All notifications marked as read",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn delete_notification(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Notifications::delete_many()
        .filter(
            Condition::all()
                .add(NotificationCol::Id.eq(id))
                .add(NotificationCol::UserId.eq(user.user_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Notification"));
    }

    Ok(ApiResponse::success(
        "Notification deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn delete_all(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    Notifications::delete_many()
        .filter(NotificationCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "All notifications deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Drop notifications older than the given number of days (default 30).
pub async fn clear_old(
    state: &AppState,
    user: &AuthUser,
    days: Option<i64>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let days = days.unwrap_or(DEFAULT_CLEAR_AGE_DAYS);
    if days < 0 {
        return Err(AppError::BadRequest("days must not be negative".into()));
    }
    let threshold = Utc::now() - Duration::days(days);

    Notifications::delete_many()
        .filter(
            Condition::all()
                .add(NotificationCol::UserId.eq(user.user_id))
                .add(NotificationCol::CreatedAt.lt(threshold)),
        )
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        format!("Notifications older than {days} days deleted"),
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn notification_from_entity(model: NotificationModel) -> Notification {
    Notification {
        id: model.id,
        user_id: model.user_id,
        content: model.content,
        is_read: model.is_read,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
