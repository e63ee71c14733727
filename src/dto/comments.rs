use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Comment;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCommentRequest {
    pub content: String,
    pub rating: i16,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub purchase_verified: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddReplyRequest {
    pub content: String,
}

/// Comments newest first, with the recomputed total.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommentList {
    pub comments: Vec<Comment>,
    pub total_comments: i32,
}
