use chrono::{Duration, Utc};
use marketplace_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        comments::{AddCommentRequest, AddReplyRequest},
        orders::CheckoutRequest,
        products::RateProductRequest,
        seller::{ProcessSellerRequest, SellerDecision, SubmitSellerRequest},
    },
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    services::{
        cart_service, comment_service, order_service, product_service, rating_service,
        seller_service,
    },
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

// Integration tests run against a real Postgres; they are skipped when no
// database is configured in the environment.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState { pool, orm }))
}

// Tests share one database and run in parallel, so every fixture gets its own
// user rows instead of truncating tables.
async fn create_user(state: &AppState, name: &str, role: Role) -> anyhow::Result<AuthUser> {
    let email = format!("{}@example.com", Uuid::new_v4());
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email),
        password_hash: Set("dummy".into()),
        role: Set(role.as_str().to_string()),
        address: NotSet,
        shop_name: NotSet,
        shop_description: NotSet,
        shop_avatar: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        name: user.name,
        role,
    })
}

async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    name: &str,
    price: i64,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller.user_id),
        name: Set(name.to_string()),
        description: Set("test product".into()),
        images: Set(serde_json::json!([])),
        category: Set("test".into()),
        quantity: Set(quantity),
        price: Set(price),
        avg_rating: NotSet,
        discount_pct: NotSet,
        discount_starts_at: NotSet,
        discount_ends_at: NotSet,
        comment_count: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

// Buyer checks out items from two sellers: one order per seller, snapshots
// carry the discounted price, stock is decremented, and the cart is emptied.
#[tokio::test]
async fn checkout_splits_orders_per_seller_and_snapshots_discounted_prices() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller_a = create_user(&state, "Shop A", Role::Seller).await?;
    let seller_b = create_user(&state, "Shop B", Role::Seller).await?;
    let buyer = create_user(&state, "Buyer", Role::User).await?;

    let discounted = create_product(&state, &seller_a, "Discounted Lamp", 10_000, 5).await?;
    let plain = create_product(&state, &seller_b, "Plain Mug", 3_000, 10).await?;

    // Put a live 20% window on the first product.
    let now = Utc::now();
    let mut active: ProductActive = marketplace_api::entity::products::Entity::find_by_id(discounted)
        .one(&state.orm)
        .await?
        .expect("product")
        .into();
    active.discount_pct = Set(20);
    active.discount_starts_at = Set(Some((now - Duration::hours(1)).into()));
    active.discount_ends_at = Set(Some((now + Duration::hours(1)).into()));
    active.update(&state.orm).await?;

    // Two of the discounted product, one of the plain one.
    cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: discounted }).await?;
    cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: discounted }).await?;
    cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: plain }).await?;

    let resp = order_service::place_order(
        &state,
        &buyer,
        CheckoutRequest {
            address: "1 Test Street".into(),
        },
    )
    .await?;
    let checkout = resp.data.expect("checkout data");

    assert_eq!(checkout.orders.len(), 2, "one order per seller");

    let order_a = checkout
        .orders
        .iter()
        .find(|o| o.order.seller_id == seller_a.user_id)
        .expect("order for first seller");
    let order_b = checkout
        .orders
        .iter()
        .find(|o| o.order.seller_id == seller_b.user_id)
        .expect("order for second seller");

    // 10000 at 20% off -> 8000 per unit, two units.
    assert_eq!(order_a.items.len(), 1);
    assert_eq!(order_a.items[0].final_price, 8_000);
    assert_eq!(order_a.items[0].quantity, 2);
    assert_eq!(order_a.order.total_price, 16_000);

    assert_eq!(order_b.items[0].final_price, 3_000);
    assert_eq!(order_b.order.total_price, 3_000);

    // Stock decremented and the cart cleared.
    let stock = marketplace_api::entity::products::Entity::find_by_id(discounted)
        .one(&state.orm)
        .await?
        .expect("product")
        .quantity;
    assert_eq!(stock, 3);

    let cart = cart_service::get_cart(&state.pool, &buyer).await?;
    assert!(cart.data.expect("cart data").items.is_empty());

    Ok(())
}

// An insufficient-stock line aborts the whole checkout; nothing is decremented
// and the cart survives.
#[tokio::test]
async fn out_of_stock_checkout_rolls_back() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, "Shop", Role::Seller).await?;
    let buyer = create_user(&state, "Buyer", Role::User).await?;

    let product = create_product(&state, &seller, "Scarce Widget", 5_000, 1).await?;

    cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: product }).await?;
    cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: product }).await?;

    let err = order_service::place_order(
        &state,
        &buyer,
        CheckoutRequest {
            address: "1 Test Street".into(),
        },
    )
    .await
    .expect_err("checkout should fail");
    // The product still exists, so the failure names it as out of stock
    // rather than missing.
    match &err {
        AppError::OutOfStock(name) => assert_eq!(name, "Scarce Widget"),
        other => panic!("expected OutOfStock, got {other:?}"),
    }

    let stock = marketplace_api::entity::products::Entity::find_by_id(product)
        .one(&state.orm)
        .await?
        .expect("product")
        .quantity;
    assert_eq!(stock, 1, "stock untouched after rollback");

    let cart = cart_service::get_cart(&state.pool, &buyer).await?;
    assert_eq!(cart.data.expect("cart data").items.len(), 1, "cart survives");

    Ok(())
}

// Adding the same product twice merges into one line; removal decrements and
// finally drops the line.
#[tokio::test]
async fn cart_merges_duplicates_and_decrements() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, "Shop", Role::Seller).await?;
    let buyer = create_user(&state, "Buyer", Role::User).await?;
    let product = create_product(&state, &seller, "Stacking Cup", 2_000, 50).await?;

    cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: product }).await?;
    let cart = cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: product })
        .await?
        .data
        .expect("cart data");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.subtotal, 4_000);

    let cart = cart_service::remove_from_cart(&state.pool, &buyer, product, false)
        .await?
        .data
        .expect("cart data");
    assert_eq!(cart.items[0].quantity, 1);

    let cart = cart_service::remove_from_cart(&state.pool, &buyer, product, false)
        .await?
        .data
        .expect("cart data");
    assert!(cart.items.is_empty(), "decrementing to zero drops the line");

    let err = cart_service::remove_from_cart(&state.pool, &buyer, product, false)
        .await
        .expect_err("nothing left to remove");
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

// Re-rating replaces the previous score instead of appending.
#[tokio::test]
async fn rating_resubmission_replaces_previous_score() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, "Shop", Role::Seller).await?;
    let rater = create_user(&state, "Rater", Role::User).await?;
    let product = create_product(&state, &seller, "Rated Chair", 20_000, 5).await?;

    let first = rating_service::submit_rating(&state, &rater, product, RateProductRequest { score: 3 })
        .await?
        .data
        .expect("product");
    assert_eq!(first.avg_rating, 3.0);

    let second = rating_service::submit_rating(&state, &rater, product, RateProductRequest { score: 5 })
        .await?
        .data
        .expect("product");
    assert_eq!(second.avg_rating, 5.0, "old score replaced, not averaged in");

    let err = rating_service::submit_rating(&state, &rater, product, RateProductRequest { score: 6 })
        .await
        .expect_err("score out of range");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

// Replies from the product's seller are flagged, others are not.
#[tokio::test]
async fn seller_replies_are_flagged() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, "Shop", Role::Seller).await?;
    let buyer = create_user(&state, "Buyer", Role::User).await?;
    let product = create_product(&state, &seller, "Commented Desk", 90_000, 2).await?;

    let comment = comment_service::add_comment(
        &state,
        &buyer,
        product,
        AddCommentRequest {
            content: "Sturdy but heavy".into(),
            rating: 4,
            images: vec![],
            purchase_verified: true,
        },
    )
    .await?
    .data
    .expect("comment");

    let seller_reply = comment_service::add_reply(
        &state,
        &seller,
        comment.id,
        AddReplyRequest {
            content: "Thanks, shipping includes lift service".into(),
        },
    )
    .await?
    .data
    .expect("reply");
    assert!(seller_reply.is_seller_reply);

    let buyer_reply = comment_service::add_reply(
        &state,
        &buyer,
        comment.id,
        AddReplyRequest {
            content: "Good to know".into(),
        },
    )
    .await?
    .data
    .expect("reply");
    assert!(!buyer_reply.is_seller_reply);

    let listed = comment_service::list_comments(&state, product)
        .await?
        .data
        .expect("comment list");
    assert_eq!(listed.total_comments, 1);
    assert_eq!(listed.comments[0].replies.len(), 2);
    assert!(listed.comments[0].replies[0].is_seller_reply, "insertion order kept");

    Ok(())
}

// A window that has already ended is wiped from the row and no longer priced in.
#[tokio::test]
async fn expired_discount_is_normalized() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, "Shop", Role::Seller).await?;
    let product = create_product(&state, &seller, "Was On Sale", 10_000, 5).await?;

    let now = Utc::now();
    let mut active: ProductActive = marketplace_api::entity::products::Entity::find_by_id(product)
        .one(&state.orm)
        .await?
        .expect("product")
        .into();
    active.discount_pct = Set(30);
    active.discount_starts_at = Set(Some((now - Duration::days(2)).into()));
    active.discount_ends_at = Set(Some((now - Duration::days(1)).into()));
    active.update(&state.orm).await?;

    let fetched = product_service::get_product(&state, product)
        .await?
        .data
        .expect("product");
    assert_eq!(fetched.final_price, 10_000);
    assert_eq!(fetched.discount_pct, 0, "window wiped");
    assert!(fetched.discount_ends_at.is_none());

    let row = marketplace_api::entity::products::Entity::find_by_id(product)
        .one(&state.orm)
        .await?
        .expect("product");
    assert_eq!(row.discount_pct, 0, "normalization persisted");

    Ok(())
}

// Onboarding: submit once, duplicates rejected, approval promotes the user and
// copies the shop profile over.
#[tokio::test]
async fn seller_onboarding_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, "Admin", Role::Admin).await?;
    let applicant = create_user(&state, "Applicant", Role::User).await?;

    let payload = SubmitSellerRequest {
        shop_name: "Corner Store".into(),
        shop_description: "Bits and pieces".into(),
        address: "2 Market Lane".into(),
        avatar_url: "https://example.com/a.png".into(),
    };

    let request = seller_service::submit_request(&state, &applicant, payload)
        .await?
        .data
        .expect("request");
    assert_eq!(request.status, "pending");

    let dup = seller_service::submit_request(
        &state,
        &applicant,
        SubmitSellerRequest {
            shop_name: "Corner Store".into(),
            shop_description: "Bits and pieces".into(),
            address: "2 Market Lane".into(),
            avatar_url: String::new(),
        },
    )
    .await
    .expect_err("pending request already exists");
    assert!(matches!(dup, AppError::Conflict(_)));

    let processed = seller_service::process_request(
        &state,
        &admin,
        request.id,
        ProcessSellerRequest {
            decision: SellerDecision::Approved,
        },
    )
    .await?
    .data
    .expect("request");
    assert_eq!(processed.status, "approved");

    let promoted = marketplace_api::entity::users::Entity::find_by_id(applicant.user_id)
        .one(&state.orm)
        .await?
        .expect("user");
    assert_eq!(promoted.role, "seller");
    assert_eq!(promoted.shop_name, "Corner Store");

    // Re-processing a settled request is rejected.
    let again = seller_service::process_request(
        &state,
        &admin,
        request.id,
        ProcessSellerRequest {
            decision: SellerDecision::Rejected,
        },
    )
    .await
    .expect_err("already processed");
    assert!(matches!(again, AppError::Conflict(_)));

    Ok(())
}

// A rejected applicant may open a fresh request; disabling a seller drops the
// role back to user but keeps the shop profile and listings.
#[tokio::test]
async fn rejected_request_resubmission_and_seller_disable() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = create_user(&state, "Admin", Role::Admin).await?;
    let applicant = create_user(&state, "Applicant", Role::User).await?;

    let first = seller_service::submit_request(
        &state,
        &applicant,
        SubmitSellerRequest {
            shop_name: "Night Market".into(),
            shop_description: "Snacks".into(),
            address: "3 Dock Road".into(),
            avatar_url: String::new(),
        },
    )
    .await?
    .data
    .expect("request");

    let rejected = seller_service::process_request(
        &state,
        &admin,
        first.id,
        ProcessSellerRequest {
            decision: SellerDecision::Rejected,
        },
    )
    .await?
    .data
    .expect("request");
    assert_eq!(rejected.status, "rejected");

    // Rejection is not terminal for the user: a new pending request opens.
    let second = seller_service::submit_request(
        &state,
        &applicant,
        SubmitSellerRequest {
            shop_name: "Night Market".into(),
            shop_description: "Snacks".into(),
            address: "3 Dock Road".into(),
            avatar_url: String::new(),
        },
    )
    .await?
    .data
    .expect("request");
    assert_ne!(second.id, first.id);
    assert_eq!(second.status, "pending");

    seller_service::process_request(
        &state,
        &admin,
        second.id,
        ProcessSellerRequest {
            decision: SellerDecision::Approved,
        },
    )
    .await?;

    let demoted = seller_service::disable_seller(&state, &admin, applicant.user_id)
        .await?
        .data
        .expect("user");
    assert_eq!(demoted.role, "user");
    assert_eq!(demoted.shop_name, "Night Market", "shop profile survives");

    let row = marketplace_api::entity::users::Entity::find_by_id(applicant.user_id)
        .one(&state.orm)
        .await?
        .expect("user");
    assert_eq!(row.role, "user");
    assert_eq!(row.shop_name, "Night Market");

    Ok(())
}

// A window that ended before the cart is read must not surface through cart
// lines or checkout snapshots.
#[tokio::test]
async fn expired_discounts_do_not_leak_into_carts_or_snapshots() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let seller = create_user(&state, "Shop", Role::Seller).await?;
    let buyer = create_user(&state, "Buyer", Role::User).await?;
    let product = create_product(&state, &seller, "Yesterday's Deal", 10_000, 5).await?;

    let now = Utc::now();
    let mut active: ProductActive = marketplace_api::entity::products::Entity::find_by_id(product)
        .one(&state.orm)
        .await?
        .expect("product")
        .into();
    active.discount_pct = Set(30);
    active.discount_starts_at = Set(Some((now - Duration::days(2)).into()));
    active.discount_ends_at = Set(Some((now - Duration::days(1)).into()));
    active.update(&state.orm).await?;

    let cart = cart_service::add_to_cart(&state.pool, &buyer, AddToCartRequest { product_id: product })
        .await?
        .data
        .expect("cart data");
    assert_eq!(cart.items[0].product.discount_pct, 0, "window wiped before serving");
    assert!(cart.items[0].product.discount_ends_at.is_none());
    assert_eq!(cart.items[0].product.final_price, 10_000);
    assert_eq!(cart.subtotal, 10_000);

    let checkout = order_service::place_order(
        &state,
        &buyer,
        CheckoutRequest {
            address: "1 Test Street".into(),
        },
    )
    .await?
    .data
    .expect("checkout data");
    let item = &checkout.orders[0].items[0];
    assert_eq!(item.discount_pct, 0, "snapshot carries no stale window");
    assert_eq!(item.final_price, 10_000);
    assert_eq!(item.price, 10_000);

    Ok(())
}
