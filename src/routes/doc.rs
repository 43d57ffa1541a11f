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
        addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
        auth::{ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest, UserSummary},
        cart::{AddToCartRequest, CartLine, CartProduct, CartView, UpdateCartItemRequest},
        orders::{OrderList, OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest, UpdatePaymentRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
        users::{ImageUploadResponse, UpdateProfileRequest, UserList},
        wishlist::{AddWishlistRequest, WishlistProducts},
    },
    entity::orders::ShippingAddress,
    middleware::access::Role,
    models::{Address, Order, OrderItem, Product, Review, User},
    response::{ApiResponse, Meta},
    routes::{cart, health, multipart::ImageForm, orders, params, products, reviews, users, wishlist},
    status::{OrderStatus, PaymentMethod, PaymentStatus},
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
        users::register,
        users::login,
        users::me,
        users::all_users,
        users::update_profile,
        users::upload_profile,
        users::forgot_password,
        users::reset_password,
        users::add_address,
        users::list_addresses,
        users::get_address,
        users::update_address,
        users::delete_address,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::upload_product_image,
        reviews::create_review,
        reviews::list_reviews,
        reviews::update_review,
        reviews::delete_review,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        wishlist::add_to_wishlist,
        wishlist::get_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::clear_wishlist,
        orders::place_order,
        orders::list_orders,
        orders::list_all_orders,
        orders::get_order,
        orders::update_order_status,
        orders::update_payment,
        orders::cancel_order
    ),
    components(
        schemas(
            User,
            Address,
            Product,
            Review,
            Order,
            OrderItem,
            ShippingAddress,
            Role,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UserSummary,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdateProfileRequest,
            UserList,
            ImageUploadResponse,
            ImageForm,
            CreateAddressRequest,
            UpdateAddressRequest,
            AddressList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartView,
            CartLine,
            CartProduct,
            AddWishlistRequest,
            WishlistProducts,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            UpdatePaymentRequest,
            OrderWithItems,
            OrderList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::SortOrder,
            params::ProductSortBy,
            health::HealthData,
            Meta,
            ApiResponse<User>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Users", description = "Accounts, login and password reset"),
        (name = "Addresses", description = "Saved shipping addresses"),
        (name = "Products", description = "Fragrance catalog"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Wishlist", description = "Wishlist"),
        (name = "Orders", description = "Order placement and fulfilment"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
