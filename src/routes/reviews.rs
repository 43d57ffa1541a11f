use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    routes::extract::{AppJson, AppPath},
    services::review_service,
    state::AppState,
};

// The same segment is a product id for POST/GET and a review id for PATCH/DELETE.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        post(create_review)
            .get(list_reviews)
            .patch(update_review)
            .delete(delete_review),
    )
}

#[utoipa::path(
    post,
    path = "/review/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review added", body = ApiResponse<Review>),
        (status = 400, description = "Invalid rating or already reviewed"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(product_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let resp = review_service::create_review(&state, &user, product_id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/review/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = ApiResponse<ReviewList>),
        (status = 404, description = "No reviews found for this product")
    ),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    AppPath(product_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_reviews(&state, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/review/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ApiResponse<Review>),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(review_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::update_review(&state, &user, review_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/review/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(review_id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete_review(&state, &user, review_id).await?;
    Ok(Json(resp))
}
