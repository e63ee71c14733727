use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{SellerRequest, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitSellerRequest {
    pub shop_name: String,
    pub shop_description: String,
    pub address: String,
    pub avatar_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SellerDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessSellerRequest {
    pub decision: SellerDecision,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerRequestList {
    pub items: Vec<SellerRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerStats {
    pub total_sellers: i64,
    pub pending_requests: i64,
}
