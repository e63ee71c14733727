use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems, Model as CartItemModel},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_seller},
    models::{Order, OrderItem, OrderStatus, Role},
    pricing,
    response::{ApiResponse, Meta},
    services::{notification_service, product_service, product_service::images_from_json},
    state::AppState,
};

/// Checkout: split the cart into per-seller orders, decrement stock with a
/// guarded update, snapshot each product into its order line, then clear the
/// cart. The whole thing runs in one transaction so a failure anywhere
/// leaves no partial decrement behind.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("address must not be empty".into()));
    }

    let now = Utc::now();
    let txn = state.orm.begin().await?;

    // Snapshots must never carry a window that already ended.
    product_service::normalize_expired_discounts(&txn, now).await?;

    let cart_rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&txn)
        .await?;

    if cart_rows.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = cart_rows.iter().map(|c| c.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    // Group by seller, preserving cart order within and across groups.
    let mut groups: Vec<(Uuid, Vec<&CartItemModel>)> = Vec::new();
    for item in &cart_rows {
        let product = products
            .get(&item.product_id)
            .ok_or(AppError::NotFound("Product"))?;
        match groups.iter_mut().find(|(seller, _)| *seller == product.seller_id) {
            Some((_, items)) => items.push(item),
            None => groups.push((product.seller_id, vec![item])),
        }
    }

    let mut placed: Vec<OrderWithItems> = Vec::new();

    for (seller_id, items) in groups {
        let order_id = Uuid::new_v4();
        let mut total_price: i64 = 0;
        let mut order_items: Vec<OrderItem> = Vec::new();

        for item in items {
            let product = &products[&item.product_id];

            // Guarded decrement: only succeeds while enough stock remains,
            // so concurrent checkouts cannot oversell.
            let result = Products::update_many()
                .col_expr(
                    ProdCol::Quantity,
                    Expr::col(ProdCol::Quantity).sub(item.quantity),
                )
                .filter(
                    Condition::all()
                        .add(ProdCol::Id.eq(item.product_id))
                        .add(ProdCol::Quantity.gte(item.quantity)),
                )
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                // Zero rows means either the stock ran out or the product
                // vanished under us; tell those apart before reporting.
                return Err(match Products::find_by_id(item.product_id).one(&txn).await? {
                    Some(p) => AppError::OutOfStock(p.name),
                    None => AppError::NotFound("Product"),
                });
            }

            let starts_at = product.discount_starts_at.map(|d| d.with_timezone(&Utc));
            let ends_at = product.discount_ends_at.map(|d| d.with_timezone(&Utc));
            let final_price = pricing::final_price(
                product.price,
                product.discount_pct,
                starts_at,
                ends_at,
                now,
            );

            let line = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                quantity: Set(item.quantity),
                name: Set(product.name.clone()),
                description: Set(product.description.clone()),
                images: Set(product.images.clone()),
                category: Set(product.category.clone()),
                seller_id: Set(product.seller_id),
                price: Set(product.price),
                discount_pct: Set(product.discount_pct),
                final_price: Set(final_price),
                avg_rating: Set(product.avg_rating),
            };

            total_price += final_price * i64::from(item.quantity);
            order_items.push(order_item_from_entity(line.insert(&txn).await?));
        }

        let order = OrderActive {
            id: Set(order_id),
            user_id: Set(user.user_id),
            seller_id: Set(seller_id),
            total_price: Set(total_price),
            address: Set(payload.address.clone()),
            status: Set(OrderStatus::Processing.as_i16()),
            ordered_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        notification_service::notify(
            &txn,
            seller_id,
            format!("New order received ({} items)", order_items.len()),
        )
        .await?;

        placed.push(OrderWithItems {
            order: order_from_entity(order)?,
            items: order_items,
        });
    }

    // The entire cart is cleared exactly once, after every group succeeded.
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({
            "orders": placed.iter().map(|o| o.order.id).collect::<Vec<_>>()
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        CheckoutResponse { orders: placed },
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    let items = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::OrderedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::empty()),
    ))
}

/// Orders for the caller's shop.
pub async fn list_seller_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_seller(user)?;
    let items = Orders::find()
        .filter(OrderCol::SellerId.eq(user.user_id))
        .order_by_desc(OrderCol::OrderedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Shop orders",
        OrderList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let items = Orders::find()
        .order_by_desc(OrderCol::OrderedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "All orders",
        OrderList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    if order.user_id != user.user_id
        && order.seller_id != user.user_id
        && user.role != Role::Admin
    {
        return Err(AppError::Forbidden);
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Status changes are allowed to the order's seller and to admins.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    if order.seller_id != user.user_id && user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }

    let mut active: OrderActive = order.into();
    active.status = Set(payload.status.as_i16());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

pub fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let status = OrderStatus::from_i16(model.status)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid order status {}", model.status)))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        seller_id: model.seller_id,
        total_price: model.total_price,
        address: model.address,
        status,
        ordered_at: model.ordered_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        name: model.name,
        description: model.description,
        images: images_from_json(&model.images),
        category: model.category,
        seller_id: model.seller_id,
        price: model.price,
        discount_pct: model.discount_pct,
        final_price: model.final_price,
        avg_rating: model.avg_rating,
    }
}
