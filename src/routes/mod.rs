use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod cart;
pub mod doc;
pub mod extract;
pub mod health;
pub mod multipart;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;
pub mod users;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/user", users::router())
        .nest("/products", products::router())
        .nest("/review", reviews::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/order", orders::router())
}

/// Every route, the docs and the 404 fallback, bound to `state`. Middleware
/// layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
