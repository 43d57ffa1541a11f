use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::record_audit,
    dto::cart::{AddToCartRequest, CartLine, CartProduct, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn ensure_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 1 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    Ok(())
}

pub fn cart_subtotal(lines: &[CartLine]) -> AppResult<i64> {
    lines.iter().try_fold(0i64, |total, line| {
        line.product
            .price
            .checked_mul(i64::from(line.quantity))
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| AppError::BadRequest("Cart total is too large".into()))
    })
}

fn cart_product(product: ProductModel) -> CartProduct {
    CartProduct {
        id: product.id,
        name: product.name,
        brand: product.brand,
        price: product.price,
        image: product.image,
        stock: product.stock,
    }
}

pub(crate) async fn load_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<CartView> {
    let items: Vec<CartLine> = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .find_also_related(Products)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(line, product)| {
            product.map(|product| CartLine {
                id: line.id,
                product: cart_product(product),
                quantity: line.quantity,
            })
        })
        .collect();

    let subtotal = cart_subtotal(&items)?;
    Ok(CartView { items, subtotal })
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = load_cart(state.db(), user.user_id).await?;
    Ok(ApiResponse::success("Cart", cart, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_quantity(payload.quantity)?;

    let txn = state.db().begin().await?;

    if Products::find_by_id(payload.product_id).one(&txn).await?.is_none() {
        return Err(AppError::not_found("Product"));
    }

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    match existing {
        Some(line) => {
            CartItems::update_many()
                .col_expr(CartCol::Quantity, Expr::col(CartCol::Quantity).add(payload.quantity))
                .filter(CartCol::Id.eq(line.id))
                .exec(&txn)
                .await?;
        }
        None => {
            // A concurrent add for the same product may insert first; fold into its line.
            let line = CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            };
            CartItems::insert(line)
                .on_conflict(
                    OnConflict::columns([CartCol::UserId, CartCol::ProductId])
                        .value(
                            CartCol::Quantity,
                            Expr::col((CartItems, CartCol::Quantity)).add(payload.quantity),
                        )
                        .to_owned(),
                )
                .exec(&txn)
                .await?;
        }
    }

    let cart = load_cart(&txn, user.user_id).await?;
    txn.commit().await?;

    record_audit(
        state.db(),
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Product added to cart", cart, Some(Meta::empty())))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    ensure_quantity(payload.quantity)?;

    let result = CartItems::update_many()
        .col_expr(CartCol::Quantity, Expr::value(payload.quantity))
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .exec(state.db())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product not found in cart".into()));
    }

    let cart = load_cart(state.db(), user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", cart, Some(Meta::empty())))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(product_id))
        .exec(state.db())
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product not found in cart".into()));
    }

    let cart = load_cart(state.db(), user.user_id).await?;
    Ok(ApiResponse::success("Product removed from cart", cart, Some(Meta::empty())))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(state.db())
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        CartView {
            items: Vec::new(),
            subtotal: 0,
        },
        Some(Meta::empty()),
    ))
}
