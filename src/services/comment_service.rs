use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::comments::{AddCommentRequest, AddReplyRequest, CommentList},
    entity::{
        comments::{
            ActiveModel as CommentActive, Column as CommentCol, Entity as Comments,
            Model as CommentModel,
        },
        products::{ActiveModel as ProductActive, Entity as Products},
        replies::{
            ActiveModel as ReplyActive, Column as ReplyCol, Entity as Replies,
            Model as ReplyModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Comment, Reply},
    response::{ApiResponse, Meta},
    services::product_service::images_from_json,
    state::AppState,
};

pub async fn add_comment(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddCommentRequest,
) -> AppResult<ApiResponse<Comment>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".into(),
        ));
    }
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("content must not be empty".into()));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let comment = CommentActive {
        id: Set(Uuid::new_v4()),
        seq: NotSet,
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        user_name: Set(user.name.clone()),
        content: Set(payload.content),
        images: Set(serde_json::json!(payload.images)),
        rating: Set(payload.rating),
        purchase_verified: Set(payload.purchase_verified),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    // Recomputed from the table, never incremented blindly.
    let count = Comments::find()
        .filter(CommentCol::ProductId.eq(product_id))
        .count(&txn)
        .await? as i32;
    let mut active: ProductActive = product.into();
    active.comment_count = Set(count);
    active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "comment_add",
        Some("comments"),
        Some(serde_json::json!({ "product_id": product_id, "comment_id": comment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Comment added",
        comment_from_entity(comment, Vec::new()),
        Some(Meta::empty()),
    ))
}

/// Append a reply to a comment. The owning product is resolved through the
/// comment's foreign key, and the reply is flagged when its author is the
/// product's seller.
pub async fn add_reply(
    state: &AppState,
    user: &AuthUser,
    comment_id: Uuid,
    payload: AddReplyRequest,
) -> AppResult<ApiResponse<Reply>> {
    if payload.content.trim().is_empty() {
        return Err(AppError::BadRequest("content must not be empty".into()));
    }

    let comment = Comments::find_by_id(comment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;

    let product = Products::find_by_id(comment.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let reply = ReplyActive {
        id: Set(Uuid::new_v4()),
        seq: NotSet,
        comment_id: Set(comment_id),
        user_id: Set(user.user_id),
        user_name: Set(user.name.clone()),
        content: Set(payload.content),
        is_seller_reply: Set(user.user_id == product.seller_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "reply_add",
        Some("replies"),
        Some(serde_json::json!({ "comment_id": comment_id, "reply_id": reply.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Reply added",
        reply_from_entity(reply),
        Some(Meta::empty()),
    ))
}

/// Comments newest first; equal timestamps fall back to insertion order.
/// Replies stay in append order.
pub async fn list_comments(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<CommentList>> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let comments = Comments::find()
        .filter(CommentCol::ProductId.eq(product_id))
        .order_by_desc(CommentCol::CreatedAt)
        .order_by_asc(CommentCol::Seq)
        .all(&state.orm)
        .await?;

    let comment_ids: Vec<Uuid> = comments.iter().map(|c| c.id).collect();
    let mut replies_by_comment: HashMap<Uuid, Vec<Reply>> = HashMap::new();
    if !comment_ids.is_empty() {
        let replies = Replies::find()
            .filter(ReplyCol::CommentId.is_in(comment_ids))
            .order_by_asc(ReplyCol::Seq)
            .all(&state.orm)
            .await?;
        for reply in replies {
            replies_by_comment
                .entry(reply.comment_id)
                .or_default()
                .push(reply_from_entity(reply));
        }
    }

    let comments = comments
        .into_iter()
        .map(|c| {
            let replies = replies_by_comment.remove(&c.id).unwrap_or_default();
            comment_from_entity(c, replies)
        })
        .collect();

    Ok(ApiResponse::success(
        "Comments",
        CommentList {
            comments,
            total_comments: product.comment_count,
        },
        Some(Meta::empty()),
    ))
}

fn comment_from_entity(model: CommentModel, replies: Vec<Reply>) -> Comment {
    Comment {
        id: model.id,
        user_id: model.user_id,
        user_name: model.user_name,
        content: model.content,
        images: images_from_json(&model.images),
        rating: model.rating,
        purchase_verified: model.purchase_verified,
        created_at: model.created_at.with_timezone(&Utc),
        replies,
    }
}

fn reply_from_entity(model: ReplyModel) -> Reply {
    Reply {
        id: model.id,
        user_id: model.user_id,
        user_name: model.user_name,
        content: model.content,
        is_seller_reply: model.is_seller_reply,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
