use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, SaveAddressRequest},
        cart::{AddToCartRequest, CartList},
        comments::{AddCommentRequest, AddReplyRequest, CommentList},
        notifications::NotificationList,
        orders::{CheckoutRequest, CheckoutResponse, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            CreateProductRequest, ProductList, RateProductRequest, SetDiscountRequest,
            UpdateProductRequest,
        },
        seller::{ProcessSellerRequest, SellerList, SellerRequestList, SellerStats, SubmitSellerRequest},
    },
    models::{
        CartItem, Comment, Notification, Order, OrderItem, Product, Reply, SellerRequest, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, health, notifications, orders, params, products as product_routes,
        seller,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::save_address,
        product_routes::list_products,
        product_routes::deal_of_day,
        product_routes::list_my_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::set_discount,
        product_routes::clear_discount,
        product_routes::rate_product,
        product_routes::list_comments,
        product_routes::add_comment,
        product_routes::add_reply,
        cart::get_cart,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::checkout,
        orders::list_my_orders,
        orders::list_seller_orders,
        orders::get_order,
        orders::update_order_status,
        seller::submit_request,
        admin::list_all_orders,
        admin::list_seller_requests,
        admin::process_seller_request,
        admin::list_sellers,
        admin::disable_seller,
        admin::seller_stats,
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read,
        notifications::delete_notification,
        notifications::delete_all,
        notifications::clear_old
    ),
    components(
        schemas(
            User,
            Product,
            Comment,
            Reply,
            CartItem,
            Order,
            OrderItem,
            SellerRequest,
            Notification,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            SaveAddressRequest,
            CreateProductRequest,
            UpdateProductRequest,
            SetDiscountRequest,
            RateProductRequest,
            ProductList,
            AddCommentRequest,
            AddReplyRequest,
            CommentList,
            AddToCartRequest,
            CartList,
            CheckoutRequest,
            CheckoutResponse,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            SubmitSellerRequest,
            ProcessSellerRequest,
            SellerRequestList,
            SellerList,
            SellerStats,
            NotificationList,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<CommentList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<NotificationList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog, pricing, ratings and comments"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and fulfillment endpoints"),
        (name = "Seller", description = "Seller onboarding endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Notifications", description = "Notification endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
