use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    pricing,
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    cart_quantity: i32,
    product_id: Uuid,
    seller_id: Uuid,
    name: String,
    description: String,
    images: serde_json::Value,
    category: String,
    quantity: i32,
    price: i64,
    avg_rating: f64,
    discount_pct: i32,
    discount_starts_at: Option<DateTime<Utc>>,
    discount_ends_at: Option<DateTime<Utc>>,
    comment_count: i32,
    created_at: DateTime<Utc>,
}

pub async fn get_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let data = load_cart(pool, user).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Add one unit of a product. Stock is not validated here; checkout owns
/// that check.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartList>> {
    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    // Atomic merge-on-add; concurrent adds from two devices both land.
    sqlx::query(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + 1
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .execute(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let data = load_cart(pool, user).await?;
    Ok(ApiResponse::success("Added to cart", data, Some(Meta::empty())))
}

/// Remove a product from the cart: entirely when `remove_all`, otherwise one
/// unit at a time, dropping the row when the quantity reaches zero.
pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
    remove_all: bool,
) -> AppResult<ApiResponse<CartList>> {
    if remove_all {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user.user_id)
            .bind(product_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Cart item"));
        }
    } else {
        // The schema enforces quantity >= 1, so a line at one unit is
        // deleted instead of decremented to zero.
        let decremented: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE cart_items
            SET quantity = quantity - 1
            WHERE user_id = $1 AND product_id = $2 AND quantity > 1
            RETURNING quantity
            "#,
        )
        .bind(user.user_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await?;

        if decremented.is_none() {
            let result =
                sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                    .bind(user.user_id)
                    .bind(product_id)
                    .execute(pool)
                    .await?;
            if result.rows_affected() == 0 {
                return Err(AppError::NotFound("Cart item"));
            }
        }
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": product_id, "remove_all": remove_all })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let data = load_cart(pool, user).await?;
    Ok(ApiResponse::success(
        "Removed from cart",
        data,
        Some(Meta::empty()),
    ))
}

/// Cart joined with live product data; the subtotal reapplies the discount
/// engine at read time rather than trusting anything stored at add-time.
async fn load_cart(pool: &DbPool, user: &AuthUser) -> AppResult<CartList> {
    let now = Utc::now();

    // Wipe windows that have already ended before serving the rows, so a
    // cart line never carries a stale discount back to the client.
    sqlx::query(
        r#"
        UPDATE products
        SET discount_pct = 0, discount_starts_at = NULL, discount_ends_at = NULL
        WHERE discount_pct > 0 AND discount_ends_at < $1
        "#,
    )
    .bind(now)
    .execute(pool)
    .await?;

    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity AS cart_quantity,
               p.id AS product_id, p.seller_id, p.name, p.description, p.images,
               p.category, p.quantity, p.price, p.avg_rating, p.discount_pct,
               p.discount_starts_at, p.discount_ends_at, p.comment_count, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at ASC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let mut subtotal: i64 = 0;
    let items: Vec<CartItem> = rows
        .into_iter()
        .map(|row| {
            let final_price = pricing::final_price(
                row.price,
                row.discount_pct,
                row.discount_starts_at,
                row.discount_ends_at,
                now,
            );
            subtotal += final_price * i64::from(row.cart_quantity);
            CartItem {
                id: row.cart_id,
                product: Product {
                    id: row.product_id,
                    seller_id: row.seller_id,
                    name: row.name,
                    description: row.description,
                    images: serde_json::from_value(row.images).unwrap_or_default(),
                    category: row.category,
                    quantity: row.quantity,
                    price: row.price,
                    final_price,
                    discount_pct: row.discount_pct,
                    discount_starts_at: row.discount_starts_at,
                    discount_ends_at: row.discount_ends_at,
                    avg_rating: row.avg_rating,
                    comment_count: row.comment_count,
                    created_at: row.created_at,
                },
                quantity: row.cart_quantity,
            }
        })
        .collect();

    Ok(CartList { items, subtotal })
}
