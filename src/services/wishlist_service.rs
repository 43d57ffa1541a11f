use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::wishlist::{AddWishlistRequest, WishlistProducts},
    entity::{
        products::Entity as Products,
        wishlist_items::{ActiveModel as WishlistActive, Column as WishlistCol, Entity as WishlistItems},
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

async fn wishlist_products(state: &AppState, user: &AuthUser) -> AppResult<Vec<Product>> {
    let items = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .order_by_asc(WishlistCol::CreatedAt)
        .find_also_related(Products)
        .all(state.db())
        .await?
        .into_iter()
        .filter_map(|(_, product)| product.map(Product::from))
        .collect();
    Ok(items)
}

pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    payload: AddWishlistRequest,
) -> AppResult<ApiResponse<WishlistProducts>> {
    if Products::find_by_id(payload.product_id)
        .one(state.db())
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Product"));
    }

    let duplicate = || AppError::BadRequest("Product already in wishlist".into());
    let existing = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .filter(WishlistCol::ProductId.eq(payload.product_id))
        .one(state.db())
        .await?;
    if existing.is_some() {
        return Err(duplicate());
    }

    WishlistActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        created_at: NotSet,
    }
    .insert(state.db())
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            duplicate()
        } else {
            err.into()
        }
    })?;

    let items = wishlist_products(state, user).await?;
    Ok(ApiResponse::success(
        "Product added to wishlist",
        WishlistProducts { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<WishlistProducts>> {
    let items = wishlist_products(state, user).await?;
    if items.is_empty() {
        return Err(AppError::NotFound("Wishlist is empty".into()));
    }
    Ok(ApiResponse::success("Wishlist", WishlistProducts { items }, Some(Meta::empty())))
}

/// Removing a product that is not in the wishlist is not an error.
pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<WishlistProducts>> {
    WishlistItems::delete_many()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .filter(WishlistCol::ProductId.eq(product_id))
        .exec(state.db())
        .await?;

    let items = wishlist_products(state, user).await?;
    Ok(ApiResponse::success(
        "Product removed from wishlist",
        WishlistProducts { items },
        Some(Meta::empty()),
    ))
}

pub async fn clear_wishlist(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<WishlistProducts>> {
    WishlistItems::delete_many()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .exec(state.db())
        .await?;

    Ok(ApiResponse::success(
        "Wishlist cleared",
        WishlistProducts { items: Vec::new() },
        Some(Meta::empty()),
    ))
}
