use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::record_audit,
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
        users::Entity as Users,
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::{
        access::{Action, Resource, ensure_owner_or},
        auth::AuthUser,
    },
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".into()));
    }
    Ok(())
}

/// Mean of the given ratings, `0.0` when there are none.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    sum as f64 / ratings.len() as f64
}

async fn refresh_product_rating<C: ConnectionTrait>(db: &C, product_id: Uuid) -> AppResult<()> {
    let ratings: Vec<i32> = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    // The product may have been deleted since; nothing to refresh then.
    if let Some(product) = Products::find_by_id(product_id).one(db).await? {
        let mut active: ProductActive = product.into();
        active.rating = Set(average_rating(&ratings));
        active.update(db).await?;
    }
    Ok(())
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    validate_rating(payload.rating)?;

    if Products::find_by_id(product_id).one(state.db()).await?.is_none() {
        return Err(AppError::not_found("Product"));
    }
    let reviewer = Users::find_by_id(user.user_id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let duplicate = || AppError::BadRequest("You have already reviewed this product".into());
    let existing = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::UserId.eq(user.user_id))
        .one(state.db())
        .await?;
    if existing.is_some() {
        return Err(duplicate());
    }

    let txn = state.db().begin().await?;
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        name: Set(reviewer.name),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            duplicate()
        } else {
            err.into()
        }
    })?;
    refresh_product_rating(&txn, product_id).await?;
    txn.commit().await?;

    record_audit(
        state.db(),
        user.user_id,
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review added successfully",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

pub async fn list_reviews(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<ReviewList>> {
    let items: Vec<Review> = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(state.db())
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    if items.is_empty() {
        return Err(AppError::NotFound("No reviews found for this product".into()));
    }

    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(Meta::empty())))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
    }

    let review = Reviews::find_by_id(review_id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("Review"))?;
    ensure_owner_or(user, review.user_id, Resource::Reviews, Action::ModerateAny)?;

    let product_id = review.product_id;
    let txn = state.db().begin().await?;
    let mut active: ReviewActive = review.into();
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(comment) = payload.comment {
        active.comment = Set(Some(comment));
    }
    active.updated_at = Set(Utc::now().into());
    let review = active.update(&txn).await?;
    refresh_product_rating(&txn, product_id).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Review updated successfully",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = Reviews::find_by_id(review_id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("Review"))?;
    ensure_owner_or(user, review.user_id, Resource::Reviews, Action::ModerateAny)?;

    let txn = state.db().begin().await?;
    Reviews::delete_by_id(review.id).exec(&txn).await?;
    refresh_product_rating(&txn, review.product_id).await?;
    txn.commit().await?;

    record_audit(
        state.db(),
        user.user_id,
        "review_delete",
        "reviews",
        serde_json::json!({ "review_id": review.id, "author_id": review.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
