//! OpenAPI documentation for the storefront API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Security schemes accepted by gated routes: the JWT session cookie set by
/// `/auth/login` and the trusted proxy identity header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_cookie".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "storefront_session",
                    "JWT session cookie issued by POST /auth/login.",
                ))),
            );
            components.security_schemes.insert(
                "proxy_header".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-storefront-user",
                    "User email asserted by a trusted upstream proxy.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        description = "E-commerce backend: catalog, customers, orders, and background jobs."
    ),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::me,
        api::handlers::collections::list_collections,
        api::handlers::collections::create_collection,
        api::handlers::collections::get_collection,
        api::handlers::collections::update_collection,
        api::handlers::collections::delete_collection,
        api::handlers::products::list_products,
        api::handlers::products::create_product,
        api::handlers::products::get_product,
        api::handlers::products::update_product,
        api::handlers::products::delete_product,
        api::handlers::products::list_reviews,
        api::handlers::products::create_review,
        api::handlers::products::list_product_images,
        api::handlers::products::create_product_image,
        api::handlers::customers::list_customers,
        api::handlers::customers::create_customer,
        api::handlers::customers::get_own_customer,
        api::handlers::customers::update_own_customer,
        api::handlers::customers::get_customer,
        api::handlers::customers::update_customer,
        api::handlers::customers::delete_customer,
        api::handlers::orders::list_orders,
        api::handlers::orders::create_order,
        api::handlers::orders::get_order,
        api::handlers::orders::update_order,
        api::handlers::orders::delete_order,
        api::handlers::jobs::list_jobs,
        api::handlers::jobs::create_job,
        api::handlers::jobs::get_job,
    ),
    components(schemas(
        api::models::auth::LoginRequest,
        api::models::auth::LoginResponse,
        api::models::users::UserResponse,
        api::models::collections::CollectionCreate,
        api::models::collections::CollectionUpdate,
        api::models::collections::CollectionResponse,
        api::models::products::ProductCreate,
        api::models::products::ProductUpdate,
        api::models::products::ProductResponse,
        api::models::products::ProductImageCreate,
        api::models::products::ProductImageResponse,
        api::models::reviews::ReviewCreate,
        api::models::reviews::ReviewResponse,
        api::models::customers::CustomerCreate,
        api::models::customers::CustomerUpdate,
        api::models::customers::CustomerResponse,
        api::models::customers::MembershipTier,
        api::models::orders::OrderCreate,
        api::models::orders::OrderItemCreate,
        api::models::orders::OrderUpdate,
        api::models::orders::OrderResponse,
        api::models::orders::OrderItemResponse,
        api::models::orders::PaymentStatus,
        api::models::jobs::JobCreate,
        api::models::jobs::JobResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Login, logout, and identity"),
        (name = "collections", description = "Product collections"),
        (name = "products", description = "Product catalog and images"),
        (name = "reviews", description = "Product reviews"),
        (name = "customers", description = "Customer profiles"),
        (name = "orders", description = "Order placement and management"),
        (name = "jobs", description = "Background job inspection"),
    )
)]
pub struct ApiDoc;
