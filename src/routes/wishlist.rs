use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::wishlist::{AddWishlistRequest, WishlistProducts},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::extract::{AppJson, AppPath},
    services::wishlist_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_wishlist).post(add_to_wishlist).delete(clear_wishlist),
        )
        .route("/{product_id}", delete(remove_from_wishlist))
}

#[utoipa::path(
    post,
    path = "/wishlist",
    request_body = AddWishlistRequest,
    responses(
        (status = 200, description = "Product added", body = ApiResponse<WishlistProducts>),
        (status = 400, description = "Product already in wishlist"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<AddWishlistRequest>,
) -> AppResult<Json<ApiResponse<WishlistProducts>>> {
    let resp = wishlist_service::add_to_wishlist(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/wishlist",
    responses(
        (status = 200, description = "Wishlisted products", body = ApiResponse<WishlistProducts>),
        (status = 404, description = "Wishlist is empty")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn get_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WishlistProducts>>> {
    let resp = wishlist_service::get_wishlist(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/wishlist/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product removed, or was never there", body = ApiResponse<WishlistProducts>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<WishlistProducts>>> {
    let resp = wishlist_service::remove_from_wishlist(&state, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/wishlist",
    responses(
        (status = 200, description = "Wishlist cleared", body = ApiResponse<WishlistProducts>)
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn clear_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WishlistProducts>>> {
    let resp = wishlist_service::clear_wishlist(&state, &user).await?;
    Ok(Json(resp))
}
