use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::RateProductRequest,
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products},
        ratings::{ActiveModel as RatingActive, Column as RatingCol, Entity as Ratings},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    services::product_service::product_from_entity,
    state::AppState,
};

/// Upsert-by-replace: a user's earlier rating on the product is removed
/// before the new one is inserted, then the mean is recomputed.
pub async fn submit_rating(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: RateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if !(1..=5).contains(&payload.score) {
        return Err(AppError::BadRequest(
            "score must be between 1 and 5".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ratings::delete_many()
        .filter(
            Condition::all()
                .add(RatingCol::ProductId.eq(product_id))
                .add(RatingCol::UserId.eq(user.user_id)),
        )
        .exec(&txn)
        .await?;

    RatingActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        score: Set(payload.score),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let scores: Vec<i16> = Ratings::find()
        .filter(RatingCol::ProductId.eq(product_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|r| r.score)
        .collect();

    // The list is never empty here (we just inserted), but guard the
    // division anyway and keep the previous average if it ever is.
    let product = if scores.is_empty() {
        product
    } else {
        let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        let mut active: ProductActive = product.into();
        active.avg_rating = Set(sum as f64 / scores.len() as f64);
        active.update(&txn).await?
    };

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_rate",
        Some("ratings"),
        Some(serde_json::json!({ "product_id": product_id, "score": payload.score })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Rating recorded",
        product_from_entity(product, Utc::now()),
        Some(Meta::empty()),
    ))
}
