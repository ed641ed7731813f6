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
        cart::{AddToCartRequest, CartItemDto, CartList},
        notifications::NotificationList,
        orders::{
            CheckoutRequest, CreateOrderRequest, OrderLineInput, OrderList, OrderWithItems,
            UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, InventoryAdjustRequest, ProductList, UpdateProductRequest},
        promotions::{
            CreatePromotionRequest, PromotionCheck, PromotionList, UpdatePromotionRequest,
            ValidatePromotionRequest,
        },
    },
    ledger::Evaluation,
    models::{
        CartItem, DiscountKind, Notification, NotificationKind, Order, OrderItem, OrderStatus,
        PaymentMethod, PaymentStatus, Product, Promotion, ShippingAddress,
    },
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, notifications, orders, products, promotions},
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
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::checkout,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::cancel_order,
        orders::pay_order,
        orders::update_order_status,
        promotions::validate_promotion,
        notifications::list_notifications,
        notifications::mark_read,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_promotions,
        admin::create_promotion,
        admin::update_promotion
    ),
    components(
        schemas(
            Product,
            Promotion,
            CartItem,
            Order,
            OrderItem,
            Notification,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            DiscountKind,
            NotificationKind,
            ShippingAddress,
            Evaluation,
            AddToCartRequest,
            CartItemDto,
            CartList,
            CheckoutRequest,
            CreateOrderRequest,
            OrderLineInput,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            CreateProductRequest,
            UpdateProductRequest,
            InventoryAdjustRequest,
            ProductList,
            CreatePromotionRequest,
            UpdatePromotionRequest,
            ValidatePromotionRequest,
            PromotionCheck,
            PromotionList,
            NotificationList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PromotionCheck>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart and checkout endpoints"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Promotions", description = "Promotion code checks"),
        (name = "Notifications", description = "Customer notification endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
