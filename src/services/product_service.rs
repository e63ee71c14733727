use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Value,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, SetDiscountRequest, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::{Product, Role},
    pricing,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub const DEAL_OF_DAY_SIZE: u64 = 10;

/// Reset discount fields on products whose window has passed. Idempotent;
/// read paths run this before serving so expired discounts never leak.
pub async fn normalize_expired_discounts<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let result = Products::update_many()
        .col_expr(Column::DiscountPct, Expr::value(0))
        .col_expr(
            Column::DiscountStartsAt,
            Expr::value(Value::ChronoDateTimeWithTimeZone(None)),
        )
        .col_expr(
            Column::DiscountEndsAt,
            Expr::value(Value::ChronoDateTimeWithTimeZone(None)),
        )
        .filter(
            Condition::all()
                .add(Column::DiscountPct.gt(0))
                .add(Column::DiscountEndsAt.lt(now)),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let now = Utc::now();
    normalize_expired_discounts(&state.orm, now).await?;

    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        if category.as_str() != "all" {
            condition = condition.add(Column::Category.eq(category.clone()));
        }
    }

    // Plain substring match; relevance ranking is out of scope.
    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::AvgRating => Column::AvgRating,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|m| product_from_entity(m, now))
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let now = Utc::now();
    normalize_expired_discounts(&state.orm, now).await?;

    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(|m| product_from_entity(m, now));
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };
    Ok(ApiResponse::success("Product", result, None))
}

/// Top discounted products in a currently active window, padded with the
/// best-rated products when fewer than ten discounts are running.
pub async fn deal_of_day(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let now = Utc::now();
    normalize_expired_discounts(&state.orm, now).await?;

    let mut models = Products::find()
        .filter(
            Condition::all()
                .add(Column::DiscountPct.gt(0))
                .add(Column::DiscountStartsAt.lte(now))
                .add(Column::DiscountEndsAt.gte(now)),
        )
        .order_by_desc(Column::DiscountPct)
        .limit(DEAL_OF_DAY_SIZE)
        .all(&state.orm)
        .await?;

    if (models.len() as u64) < DEAL_OF_DAY_SIZE {
        let remaining = DEAL_OF_DAY_SIZE - models.len() as u64;
        let seen: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let padding = Products::find()
            .filter(Column::Id.is_not_in(seen))
            .order_by_desc(Column::AvgRating)
            .limit(remaining)
            .all(&state.orm)
            .await?;
        models.extend(padding);
    }

    let items = models
        .into_iter()
        .map(|m| product_from_entity(m, now))
        .collect();
    Ok(ApiResponse::success(
        "Deal of day",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_seller_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_seller(user)?;
    let now = Utc::now();
    normalize_expired_discounts(&state.orm, now).await?;

    let items = Products::find()
        .filter(Column::SellerId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|m| product_from_entity(m, now))
        .collect();

    Ok(ApiResponse::success(
        "My products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_seller(user)?;
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.quantity < 0 {
        return Err(AppError::BadRequest("quantity must not be negative".into()));
    }

    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        seller_id: Set(user.user_id),
        name: Set(payload.name),
        description: Set(payload.description),
        images: Set(serde_json::json!(payload.images)),
        category: Set(payload.category),
        quantity: Set(payload.quantity),
        price: Set(payload.price),
        avg_rating: Set(0.0),
        discount_pct: Set(0),
        discount_starts_at: Set(None),
        discount_ends_at: Set(None),
        comment_count: Set(0),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product, Utc::now()),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_owned_product(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(images) = payload.images {
        active.images = Set(serde_json::json!(images));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(quantity) = payload.quantity {
        if quantity < 0 {
            return Err(AppError::BadRequest("quantity must not be negative".into()));
        }
        active.quantity = Set(quantity);
    }
    if let Some(price) = payload.price {
        if price < 0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        active.price = Set(price);
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product, Utc::now()),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_owned_product(state, user, id).await?;
    Products::delete_by_id(existing.id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn set_discount(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetDiscountRequest,
) -> AppResult<ApiResponse<Product>> {
    if !(1..=100).contains(&payload.discount_pct) {
        return Err(AppError::BadRequest(
            "discount_pct must be between 1 and 100".into(),
        ));
    }
    if payload.starts_at >= payload.ends_at {
        return Err(AppError::BadRequest(
            "discount window must start before it ends".into(),
        ));
    }

    let existing = find_owned_product(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.discount_pct = Set(payload.discount_pct);
    active.discount_starts_at = Set(Some(payload.starts_at.into()));
    active.discount_ends_at = Set(Some(payload.ends_at.into()));
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "discount_set",
        Some("products"),
        Some(serde_json::json!({ "product_id": id, "discount_pct": payload.discount_pct })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Discount set",
        product_from_entity(product, Utc::now()),
        Some(Meta::empty()),
    ))
}

pub async fn clear_discount(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_owned_product(state, user, id).await?;

    let mut active: ActiveModel = existing.into();
    active.discount_pct = Set(0);
    active.discount_starts_at = Set(None);
    active.discount_ends_at = Set(None);
    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Discount cleared",
        product_from_entity(product, Utc::now()),
        Some(Meta::empty()),
    ))
}

/// Fetch a product enforcing ownership: sellers may only touch their own
/// listings, admins may touch any.
async fn find_owned_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ProductModel> {
    ensure_seller(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    if existing.seller_id != user.user_id && user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(existing)
}

pub fn product_from_entity(model: ProductModel, now: DateTime<Utc>) -> Product {
    let starts_at = model.discount_starts_at.map(|d| d.with_timezone(&Utc));
    let ends_at = model.discount_ends_at.map(|d| d.with_timezone(&Utc));
    let final_price = pricing::final_price(
        model.price,
        model.discount_pct,
        starts_at,
        ends_at,
        now,
    );
    Product {
        id: model.id,
        seller_id: model.seller_id,
        name: model.name,
        description: model.description,
        images: images_from_json(&model.images),
        category: model.category,
        quantity: model.quantity,
        price: model.price,
        final_price,
        discount_pct: model.discount_pct,
        discount_starts_at: starts_at,
        discount_ends_at: ends_at,
        avg_rating: model.avg_rating,
        comment_count: model.comment_count,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn images_from_json(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
