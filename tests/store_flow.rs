// End-to-end store flows against a real Postgres.
//
// Skipped unless TEST_DATABASE_URL (or DATABASE_URL) is set. Every test works
// on its own freshly registered users and products, so runs can share a
// database and execute in parallel.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use scentara_api::{
    config::JwtConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::{ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest},
        cart::AddToCartRequest,
        orders::{PlaceOrderRequest, UpdateOrderStatusRequest},
        products::CreateProductRequest,
        reviews::CreateReviewRequest,
        wishlist::AddWishlistRequest,
    },
    entity::orders::ShippingAddress,
    error::{AppError, AppResult},
    middleware::{access::Role, auth::AuthUser},
    services::{
        auth_service::{self, decode_token},
        cart_service,
        mail_service::{Mailer, OutgoingMail},
        order_service, product_service, review_service,
        upload_service::DisabledImageStore,
        wishlist_service,
    },
    state::AppState,
    status::PaymentMethod,
};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> AppResult<()> {
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

struct Harness {
    state: AppState,
    mailer: Arc<RecordingMailer>,
}

async fn harness() -> Option<Harness> {
    dotenvy::dotenv().ok();
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;
    let orm = create_orm_conn(&url).await.unwrap();
    run_migrations(&orm).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState {
        orm: Arc::new(orm),
        jwt: JwtConfig {
            secret: "store-flow-secret".into(),
            ttl_hours: 1,
        },
        mailer: mailer.clone(),
        images: Arc::new(DisabledImageStore),
    };
    Some(Harness { state, mailer })
}

fn unique_email(tag: &str) -> String {
    format!("{tag}-{}@example.com", Uuid::new_v4().simple())
}

async fn register(state: &AppState, tag: &str) -> (AuthUser, String) {
    let email = unique_email(tag);
    let user = auth_service::register_user(
        state,
        RegisterRequest {
            name: tag.to_string(),
            email: email.clone(),
            password: "secret1".into(),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    (
        AuthUser {
            user_id: user.id,
            role: Role::User,
        },
        email,
    )
}

fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

async fn product(state: &AppState, price: i64, stock: i32) -> Uuid {
    product_service::create_product(
        state,
        &admin(),
        CreateProductRequest {
            name: format!("Flow {}", Uuid::new_v4().simple()),
            brand: "Scentara".into(),
            description: None,
            category: "Unisex".into(),
            fragrance_type: Some("Woody".into()),
            volume: 50,
            price,
            original_price: None,
            stock,
            ingredients: vec![],
            top_notes: vec![],
            middle_notes: vec![],
            base_notes: vec![],
            image: "https://img.example/flow.png".into(),
            is_featured: false,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap()
    .id
}

async fn add(state: &AppState, user: &AuthUser, product_id: Uuid, quantity: i32) {
    cart_service::add_to_cart(state, user, AddToCartRequest { product_id, quantity })
        .await
        .unwrap();
}

fn home() -> ShippingAddress {
    ShippingAddress {
        label: "Home".into(),
        full_name: "Flow Tester".into(),
        phone: "5550100".into(),
        pincode: "10001".into(),
        state: "NY".into(),
        city: "New York".into(),
        address_line: "1 Main St".into(),
        landmark: None,
    }
}

async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<Uuid> {
    let placed = order_service::place_order(
        state,
        user,
        PlaceOrderRequest {
            payment_method: Some(PaymentMethod::Cod),
            shipping_address: Some(home()),
            address_id: None,
        },
    )
    .await?;
    Ok(placed.data.unwrap().order.id)
}

async fn advance(state: &AppState, order_id: Uuid, status: &str) {
    order_service::update_order_status(
        state,
        &admin(),
        order_id,
        UpdateOrderStatusRequest {
            status: status.into(),
            tracking_id: None,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn registering_twice_is_rejected_and_login_issues_a_token() {
    let Some(h) = harness().await else { return };
    let (user, email) = register(&h.state, "dup").await;

    let err = auth_service::register_user(
        &h.state,
        RegisterRequest {
            name: "dup".into(),
            email: email.to_uppercase(),
            password: "secret1".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "User already exists"));

    let login = auth_service::login_user(
        &h.state,
        LoginRequest {
            email,
            password: "secret1".into(),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    let claims = decode_token(&h.state.jwt, &login.token).unwrap();
    assert_eq!(claims.sub, user.user_id.to_string());
    assert_eq!(claims.role, "user");
}

#[tokio::test]
async fn adding_the_same_product_increments_the_line() {
    let Some(h) = harness().await else { return };
    let (user, _) = register(&h.state, "cart").await;
    let product_id = product(&h.state, 10, 20).await;

    add(&h.state, &user, product_id, 2).await;
    add(&h.state, &user, product_id, 3).await;

    let cart = cart_service::get_cart(&h.state, &user).await.unwrap().data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.subtotal, 50);
}

#[tokio::test]
async fn checkout_totals_the_cart_and_empties_it() {
    let Some(h) = harness().await else { return };
    let (user, _) = register(&h.state, "checkout").await;
    let ten = product(&h.state, 10, 5).await;
    let five = product(&h.state, 5, 5).await;
    add(&h.state, &user, ten, 2).await;
    add(&h.state, &user, five, 1).await;

    let order_id = checkout(&h.state, &user).await.unwrap();
    let order = order_service::get_order(&h.state, &user, order_id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(order.order.total_amount, 25);
    assert_eq!(order.order.order_status, "Pending");
    assert_eq!(order.order.payment_status, "Pending");
    assert_eq!(order.items.len(), 2);

    let cart = cart_service::get_cart(&h.state, &user).await.unwrap().data.unwrap();
    assert!(cart.items.is_empty());

    let stock = product_service::get_product(&h.state, ten)
        .await
        .unwrap()
        .data
        .unwrap()
        .stock;
    assert_eq!(stock, 3);
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let Some(h) = harness().await else { return };
    let (user, _) = register(&h.state, "empty").await;
    let err = checkout(&h.state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Cart is empty"));
}

#[tokio::test]
async fn shipped_orders_stay_put_while_pending_ones_cancel_and_restock() {
    let Some(h) = harness().await else { return };
    let (user, _) = register(&h.state, "cancel").await;
    let product_id = product(&h.state, 10, 4).await;

    add(&h.state, &user, product_id, 1).await;
    let shipped = checkout(&h.state, &user).await.unwrap();
    advance(&h.state, shipped, "Processing").await;
    advance(&h.state, shipped, "Shipped").await;
    let err = order_service::cancel_order(&h.state, &user, shipped)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    add(&h.state, &user, product_id, 2).await;
    let pending = checkout(&h.state, &user).await.unwrap();
    let cancelled = order_service::cancel_order(&h.state, &user, pending)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(cancelled.order.order_status, "Cancelled");

    let stock = product_service::get_product(&h.state, product_id)
        .await
        .unwrap()
        .data
        .unwrap()
        .stock;
    assert_eq!(stock, 3);
}

#[tokio::test]
async fn wishlist_rejects_duplicates_and_ignores_absent_removals() {
    let Some(h) = harness().await else { return };
    let (user, _) = register(&h.state, "wish").await;
    let product_id = product(&h.state, 10, 1).await;

    wishlist_service::add_to_wishlist(&h.state, &user, AddWishlistRequest { product_id })
        .await
        .unwrap();
    let err = wishlist_service::add_to_wishlist(&h.state, &user, AddWishlistRequest { product_id })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Product already in wishlist"));

    let other = product(&h.state, 10, 1).await;
    let list = wishlist_service::remove_from_wishlist(&h.state, &user, other)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(list.items.len(), 1);
}

#[tokio::test]
async fn only_the_author_may_delete_a_review() {
    let Some(h) = harness().await else { return };
    let (author, _) = register(&h.state, "author").await;
    let (stranger, _) = register(&h.state, "stranger").await;
    let product_id = product(&h.state, 10, 1).await;

    let review = review_service::create_review(
        &h.state,
        &author,
        product_id,
        CreateReviewRequest {
            rating: 4,
            comment: Some("Lovely drydown".into()),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();

    let err = review_service::delete_review(&h.state, &stranger, review.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    review_service::delete_review(&h.state, &author, review.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn password_reset_uses_the_mailed_otp() {
    let Some(h) = harness().await else { return };
    let (_, email) = register(&h.state, "reset").await;

    auth_service::forgot_password(&h.state, ForgotPasswordRequest { email: email.clone() })
        .await
        .unwrap();
    let otp = {
        let sent = h.mailer.sent.lock().unwrap();
        let mail = sent.iter().find(|m| m.to == email).unwrap();
        mail.body
            .split_whitespace()
            .find_map(|word| {
                let digits = word.trim_end_matches('.');
                (digits.len() == 6 && digits.chars().all(|c| c.is_ascii_digit()))
                    .then(|| digits.to_string())
            })
            .unwrap()
    };

    let wrong = auth_service::reset_password(
        &h.state,
        ResetPasswordRequest {
            email: email.clone(),
            otp: "not-it".into(),
            new_password: "fresh-secret".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(wrong, AppError::BadRequest(ref msg) if msg == "Invalid or expired OTP"));

    auth_service::reset_password(
        &h.state,
        ResetPasswordRequest {
            email: email.clone(),
            otp: otp.clone(),
            new_password: "fresh-secret".into(),
        },
    )
    .await
    .unwrap();

    auth_service::login_user(
        &h.state,
        LoginRequest {
            email: email.clone(),
            password: "fresh-secret".into(),
        },
    )
    .await
    .unwrap();

    // The OTP is single use.
    let reused = auth_service::reset_password(
        &h.state,
        ResetPasswordRequest {
            email,
            otp,
            new_password: "another-one".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(reused, AppError::BadRequest(_)));
}
