use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Account role. Promotion user -> seller happens only through an approved
/// seller request; demotion happens through the admin disable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "seller" => Some(Role::Seller),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Order lifecycle, stored as its ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            OrderStatus::Processing => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::Delivered => 2,
            OrderStatus::Cancelled => 3,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(OrderStatus::Processing),
            1 => Some(OrderStatus::Shipped),
            2 => Some(OrderStatus::Delivered),
            3 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: String,
    pub role: String,
    pub shop_name: String,
    pub shop_description: String,
    pub shop_avatar: String,
    pub created_at: DateTime<Utc>,
}

/// API-facing product. `final_price` is derived by the discount engine at
/// read time and never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub category: String,
    pub quantity: i32,
    pub price: i64,
    pub final_price: i64,
    pub discount_pct: i32,
    pub discount_starts_at: Option<DateTime<Utc>>,
    pub discount_ends_at: Option<DateTime<Utc>>,
    pub avg_rating: f64,
    pub comment_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub content: String,
    pub images: Vec<String>,
    pub rating: i16,
    pub purchase_verified: bool,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Reply {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub content: String,
    pub is_seller_reply: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: Uuid,
    pub total_price: i64,
    pub address: String,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

/// One order line with the product snapshot taken at checkout. The snapshot
/// does not track later product edits.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub category: String,
    pub seller_id: Uuid,
    pub price: i64,
    pub discount_pct: i32,
    pub final_price: i64,
    pub avg_rating: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SellerRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_name: String,
    pub shop_description: String,
    pub address: String,
    pub avatar_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
