// Service rules checked against sea-orm's mock connection. Each test queues
// exactly the rows the service reads; write paths are checked against the
// statement log the mock records.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use uuid::Uuid;

use scentara_api::{
    config::JwtConfig,
    dto::{
        addresses::{CreateAddressRequest, UpdateAddressRequest},
        auth::{LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::PlaceOrderRequest,
        wishlist::AddWishlistRequest,
    },
    entity::{addresses, cart_items, order_items, orders, products, reviews, users, wishlist_items},
    error::AppError,
    middleware::{access::Role, auth::AuthUser},
    services::{
        auth_service::{self, decode_token, hash_password},
        address_service, cart_service,
        mail_service::DisabledMailer,
        order_service, review_service,
        upload_service::DisabledImageStore,
        wishlist_service,
    },
    state::AppState,
    status::PaymentMethod,
};

fn jwt() -> JwtConfig {
    JwtConfig {
        secret: "mock-secret".into(),
        ttl_hours: 1,
    }
}

fn state(orm: DatabaseConnection) -> AppState {
    AppState {
        orm: Arc::new(orm),
        jwt: jwt(),
        mailer: Arc::new(DisabledMailer),
        images: Arc::new(DisabledImageStore),
    }
}

fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn affected(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

/// Every statement the service sent, rendered as one searchable string.
fn statements(state: AppState) -> String {
    let orm = Arc::try_unwrap(state.orm)
        .ok()
        .expect("connection is no longer shared");
    format!("{:?}", orm.into_transaction_log()).replace("\\\"", "\"")
}

fn user_row(id: Uuid, email: &str, password: &str, role: Role) -> users::Model {
    let now = Utc::now().fixed_offset();
    users::Model {
        id,
        name: "Jane".into(),
        email: email.into(),
        password_hash: hash_password(password).unwrap(),
        role: role.to_string(),
        profile_image: String::new(),
        phone: None,
        gender: None,
        reset_otp: None,
        reset_otp_expires_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn product_row(id: Uuid) -> products::Model {
    priced_product(id, 1000)
}

fn priced_product(id: Uuid, price: i64) -> products::Model {
    let now = Utc::now().fixed_offset();
    products::Model {
        id,
        name: "Noir".into(),
        brand: "Scentara".into(),
        description: None,
        category: "Unisex".into(),
        fragrance_type: None,
        volume: 50,
        price,
        original_price: None,
        stock: 5,
        ingredients: vec![],
        top_notes: vec![],
        middle_notes: vec![],
        base_notes: vec![],
        image: String::new(),
        rating: 0.0,
        is_featured: false,
        created_at: now,
        updated_at: now,
    }
}

fn order_row(id: Uuid, user_id: Uuid, status: &str) -> orders::Model {
    let now = Utc::now().fixed_offset();
    orders::Model {
        id,
        user_id,
        shipping_address: orders::ShippingAddress {
            label: "Home".into(),
            full_name: "Jane".into(),
            phone: "5550100".into(),
            pincode: "10001".into(),
            state: "NY".into(),
            city: "New York".into(),
            address_line: "1 Main St".into(),
            landmark: None,
        },
        payment_method: "COD".into(),
        payment_status: "Pending".into(),
        order_status: status.into(),
        total_amount: 2500,
        transaction_id: None,
        tracking_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn customer(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::User,
    }
}

#[tokio::test]
async fn registering_a_taken_email_fails() {
    let existing = user_row(Uuid::new_v4(), "jane@example.com", "secret1", Role::User);
    let state = state(mock().append_query_results([vec![existing]]).into_connection());

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Jane".into(),
            email: "Jane@Example.com".into(),
            password: "secret1".into(),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "User already exists"));
}

#[tokio::test]
async fn login_token_carries_the_stored_identity() {
    let id = Uuid::new_v4();
    let row = user_row(id, "admin@example.com", "secret1", Role::Admin);
    let state = state(mock().append_query_results([vec![row]]).into_connection());

    let resp = auth_service::login_user(
        &state,
        LoginRequest {
            email: "admin@example.com".into(),
            password: "secret1".into(),
        },
    )
    .await
    .unwrap();

    let login = resp.data.unwrap();
    let claims = decode_token(&jwt(), &login.token).unwrap();
    assert_eq!(claims.sub, id.to_string());
    assert_eq!(claims.role, "admin");
    assert_eq!(login.user.id, id);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let row = user_row(Uuid::new_v4(), "jane@example.com", "secret1", Role::User);
    let state = state(mock().append_query_results([vec![row]]).into_connection());

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: "jane@example.com".into(),
            password: "wrong-one".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(ref msg) if msg == "Invalid credentials"));
}

#[tokio::test]
async fn login_with_unknown_email_is_not_found() {
    let state = state(
        mock()
            .append_query_results([Vec::<users::Model>::new()])
            .into_connection(),
    );
    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: "ghost@example.com".into(),
            password: "whatever".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "User not found"));
}

#[tokio::test]
async fn strangers_cannot_delete_a_review() {
    let author = Uuid::new_v4();
    let now = Utc::now().fixed_offset();
    let review = reviews::Model {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        user_id: author,
        name: "Author".into(),
        rating: 4,
        comment: None,
        created_at: now,
        updated_at: now,
    };
    let state = state(mock().append_query_results([vec![review.clone()]]).into_connection());

    let err = review_service::delete_review(&state, &customer(Uuid::new_v4()), review.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn duplicate_wishlist_add_is_rejected() {
    let user_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    let item = wishlist_items::Model {
        id: Uuid::new_v4(),
        user_id,
        product_id,
        created_at: Utc::now().fixed_offset(),
    };
    let state = state(
        mock()
            .append_query_results([vec![product_row(product_id)]])
            .append_query_results([vec![item]])
            .into_connection(),
    );

    let err = wishlist_service::add_to_wishlist(
        &state,
        &customer(user_id),
        AddWishlistRequest { product_id },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Product already in wishlist"));
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
    let owner = Uuid::new_v4();
    let order = order_row(Uuid::new_v4(), owner, "Shipped");
    let state = state(mock().append_query_results([vec![order.clone()]]).into_connection());

    let err = order_service::cancel_order(&state, &customer(owner), order.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::BadRequest(ref msg)
            if msg == "Cannot cancel an order that has already been shipped or delivered"
    ));
}

#[tokio::test]
async fn someone_elses_order_reads_as_missing() {
    let order = order_row(Uuid::new_v4(), Uuid::new_v4(), "Pending");
    let state = state(mock().append_query_results([vec![order.clone()]]).into_connection());

    let err = order_service::get_order(&state, &customer(Uuid::new_v4()), order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Order not found"));
}

fn cart_line(user_id: Uuid, product_id: Uuid, quantity: i32) -> cart_items::Model {
    cart_items::Model {
        id: Uuid::new_v4(),
        user_id,
        product_id,
        quantity,
        created_at: Utc::now().fixed_offset(),
    }
}

fn address_row(user_id: Uuid, is_default: bool) -> addresses::Model {
    let now = Utc::now().fixed_offset();
    addresses::Model {
        id: Uuid::new_v4(),
        user_id,
        label: "Home".into(),
        full_name: "Jane".into(),
        phone: "5550100".into(),
        pincode: "10001".into(),
        state: "NY".into(),
        city: "New York".into(),
        address_line: "1 Main St".into(),
        landmark: None,
        is_default,
        created_at: now,
        updated_at: now,
    }
}

fn new_address(is_default: bool) -> CreateAddressRequest {
    CreateAddressRequest {
        label: "Office".into(),
        full_name: "Jane".into(),
        phone: "5550199".into(),
        pincode: "10002".into(),
        state: "NY".into(),
        city: "New York".into(),
        address_line: "2 Side St".into(),
        landmark: None,
        is_default,
    }
}

#[tokio::test]
async fn adding_a_product_already_in_the_cart_increments_its_line() {
    let user_id = Uuid::new_v4();
    let product = product_row(Uuid::new_v4());
    let line = cart_line(user_id, product.id, 2);
    let merged = cart_line(user_id, product.id, 5);
    let state = state(
        mock()
            .append_query_results([vec![product.clone()]])
            .append_query_results([vec![line]])
            .append_query_results([vec![(merged, product.clone())]])
            .append_exec_results([affected(1)])
            .into_connection(),
    );

    let cart = cart_service::add_to_cart(
        &state,
        &customer(user_id),
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.subtotal, 5 * product.price);

    let log = statements(state);
    assert!(log.contains(r#"UPDATE "cart_items""#), "{log}");
    assert!(!log.contains(r#"INSERT INTO "cart_items""#), "{log}");
}

#[tokio::test]
async fn changing_a_product_missing_from_the_cart_is_not_found() {
    let state = state(mock().append_exec_results([affected(0)]).into_connection());
    let err = cart_service::update_cart_item(
        &state,
        &customer(Uuid::new_v4()),
        UpdateCartItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 2,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Product not found in cart"));
}

#[tokio::test]
async fn removing_a_product_missing_from_the_cart_is_not_found() {
    let state = state(mock().append_exec_results([affected(0)]).into_connection());
    let err = cart_service::remove_from_cart(&state, &customer(Uuid::new_v4()), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Product not found in cart"));
}

#[tokio::test]
async fn zero_quantity_never_reaches_the_database() {
    let state = state(mock().into_connection());
    let err = cart_service::add_to_cart(
        &state,
        &customer(Uuid::new_v4()),
        AddToCartRequest {
            product_id: Uuid::new_v4(),
            quantity: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn checkout_records_the_total_and_empties_the_cart() {
    let user_id = Uuid::new_v4();
    let ten = priced_product(Uuid::new_v4(), 10);
    let five = priced_product(Uuid::new_v4(), 5);
    let order_id = Uuid::new_v4();
    let mut placed = order_row(order_id, user_id, "Pending");
    placed.total_amount = 25;
    let item = |product: &products::Model, quantity: i32| order_items::Model {
        id: Uuid::new_v4(),
        order_id,
        product_id: product.id,
        name: product.name.clone(),
        image: product.image.clone(),
        price: product.price,
        quantity,
    };

    let state = state(
        mock()
            .append_query_results([vec![
                cart_line(user_id, ten.id, 2),
                cart_line(user_id, five.id, 1),
            ]])
            .append_query_results([vec![ten.clone(), five.clone()]])
            .append_query_results([vec![placed]])
            .append_query_results([vec![item(&ten, 2)], vec![item(&five, 1)]])
            .append_exec_results([affected(1), affected(1), affected(2)])
            .into_connection(),
    );

    let order = order_service::place_order(
        &state,
        &customer(user_id),
        PlaceOrderRequest {
            payment_method: Some(PaymentMethod::Cod),
            shipping_address: Some(order_row(order_id, user_id, "Pending").shipping_address),
            address_id: None,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(order.items.len(), 2);

    let log = statements(state);
    assert!(log.contains(r#"INSERT INTO "orders""#), "{log}");
    assert!(log.contains("BigInt(Some(25))"), "{log}");
    // Order and payment status both start out pending.
    assert_eq!(log.matches(r#"String(Some("Pending"))"#).count(), 2, "{log}");
    assert!(log.contains(r#"UPDATE "products""#), "{log}");
    assert!(log.contains(r#"DELETE FROM "cart_items""#), "{log}");
}

#[tokio::test]
async fn checkout_refuses_an_empty_cart() {
    let state = state(
        mock()
            .append_query_results([Vec::<cart_items::Model>::new()])
            .into_connection(),
    );
    let err = order_service::place_order(
        &state,
        &customer(Uuid::new_v4()),
        PlaceOrderRequest {
            payment_method: Some(PaymentMethod::Online),
            shipping_address: Some(order_row(Uuid::new_v4(), Uuid::new_v4(), "Pending").shipping_address),
            address_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Cart is empty"));

    let log = statements(state);
    assert!(!log.contains(r#"INSERT INTO "orders""#), "{log}");
}

#[tokio::test]
async fn checkout_refuses_more_than_is_in_stock() {
    let user_id = Uuid::new_v4();
    let product = product_row(Uuid::new_v4());
    let state = state(
        mock()
            .append_query_results([vec![cart_line(user_id, product.id, product.stock + 1)]])
            .append_query_results([vec![product]])
            .into_connection(),
    );
    let err = order_service::place_order(
        &state,
        &customer(user_id),
        PlaceOrderRequest {
            payment_method: Some(PaymentMethod::Cod),
            shipping_address: Some(order_row(Uuid::new_v4(), user_id, "Pending").shipping_address),
            address_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.starts_with("Insufficient stock")));
}

#[tokio::test]
async fn a_new_default_address_clears_the_previous_default_first() {
    let user_id = Uuid::new_v4();
    let previous = address_row(user_id, true);
    let added = address_row(user_id, true);
    let mut demoted = previous.clone();
    demoted.is_default = false;

    let state = state(
        mock()
            .append_query_results([vec![previous]])
            .append_query_results([vec![added.clone()]])
            .append_query_results([vec![demoted, added]])
            .append_exec_results([affected(1)])
            .into_connection(),
    );

    let list = address_service::add_address(&state, &customer(user_id), new_address(true))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(list.items.iter().filter(|a| a.is_default).count(), 1);

    let log = statements(state);
    let cleared = log.find(r#"UPDATE "addresses""#).expect("default cleared");
    let inserted = log.find(r#"INSERT INTO "addresses""#).expect("address inserted");
    assert!(cleared < inserted, "{log}");
}

#[tokio::test]
async fn a_plain_address_leaves_the_default_alone() {
    let user_id = Uuid::new_v4();
    let added = address_row(user_id, false);
    let state = state(
        mock()
            .append_query_results([vec![added.clone()]])
            .append_query_results([vec![added]])
            .into_connection(),
    );

    address_service::add_address(&state, &customer(user_id), new_address(false))
        .await
        .unwrap();

    let log = statements(state);
    assert!(!log.contains(r#"UPDATE "addresses""#), "{log}");
}

#[tokio::test]
async fn promoting_an_address_demotes_the_old_default() {
    let user_id = Uuid::new_v4();
    let old_default = address_row(user_id, true);
    let target = address_row(user_id, false);
    let mut promoted = target.clone();
    promoted.is_default = true;

    let state = state(
        mock()
            .append_query_results([vec![target.clone()]])
            .append_query_results([vec![old_default, target.clone()]])
            .append_query_results([vec![promoted.clone()]])
            .append_query_results([vec![promoted]])
            .append_exec_results([affected(1)])
            .into_connection(),
    );

    address_service::update_address(
        &state,
        &customer(user_id),
        target.id,
        UpdateAddressRequest {
            is_default: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let log = statements(state);
    let demoted = log.find(r#"UPDATE "addresses" SET "is_default""#).expect("old default cleared");
    let saved = log.rfind(r#"UPDATE "addresses""#).unwrap();
    assert!(demoted < saved, "{log}");
}

#[tokio::test]
async fn another_users_address_reads_as_missing() {
    let state = state(
        mock()
            .append_query_results([Vec::<addresses::Model>::new()])
            .into_connection(),
    );
    let err = address_service::get_address(&state, &customer(Uuid::new_v4()), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Address not found"));

    let log = statements(state);
    assert!(log.contains(r#""addresses"."user_id""#), "{log}");
}

#[tokio::test]
async fn another_users_address_cannot_be_updated() {
    let state = state(
        mock()
            .append_query_results([Vec::<addresses::Model>::new()])
            .into_connection(),
    );
    let err = address_service::update_address(
        &state,
        &customer(Uuid::new_v4()),
        Uuid::new_v4(),
        UpdateAddressRequest {
            city: Some("Boston".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let log = statements(state);
    assert!(!log.contains("UPDATE"), "{log}");
}

#[tokio::test]
async fn deleting_an_address_that_is_not_yours_is_not_found() {
    let state = state(mock().append_exec_results([affected(0)]).into_connection());
    let err = address_service::delete_address(&state, &customer(Uuid::new_v4()), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Address not found"));
}

#[tokio::test]
async fn deleting_your_address_returns_the_remaining_ones() {
    let user_id = Uuid::new_v4();
    let kept = address_row(user_id, true);
    let state = state(
        mock()
            .append_exec_results([affected(1)])
            .append_query_results([vec![kept.clone()]])
            .into_connection(),
    );
    let list = address_service::delete_address(&state, &customer(user_id), Uuid::new_v4())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].id, kept.id);
}
