use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set};

use crate::{
    audit::record_audit,
    dto::users::{ImageUploadResponse, UpdateProfileRequest, UserList},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::{
        access::{Action, Resource, ensure_capability},
        auth::AuthUser,
    },
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::upload_service::{ImageUpload, USER_IMAGE_FOLDER, validate_image},
    state::AppState,
};

async fn load_user(state: &AppState, user: &AuthUser) -> AppResult<UserModel> {
    Users::find_by_id(user.user_id)
        .one(state.db())
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let profile = load_user(state, user).await?;
    Ok(ApiResponse::success("OK", User::from(profile), Some(Meta::empty())))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_capability(user, Resource::Users, Action::ListAll)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(state.db()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.db())
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = load_user(state, user).await?;

    let mut active: UserActive = existing.into();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name is required".into()));
        }
        active.name = Set(name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(Some(gender));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(state.db()).await?;

    Ok(ApiResponse::success(
        "Profile updated successfully",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn upload_profile_image(
    state: &AppState,
    user: &AuthUser,
    image: ImageUpload,
) -> AppResult<ApiResponse<ImageUploadResponse>> {
    validate_image(Some(&image.file_name), Some(&image.content_type))?;
    let existing = load_user(state, user).await?;

    let image_url = state.images.upload(USER_IMAGE_FOLDER, image).await?;

    let mut active: UserActive = existing.into();
    active.profile_image = Set(image_url.clone());
    active.updated_at = Set(Utc::now().into());
    active.update(state.db()).await?;

    record_audit(
        state.db(),
        user.user_id,
        "profile_image_upload",
        "users",
        serde_json::json!({ "image_url": image_url }),
    )
    .await;

    Ok(ApiResponse::success(
        "Profile image uploaded successfully",
        ImageUploadResponse { image_url },
        Some(Meta::empty()),
    ))
}
