use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
        auth::{ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest},
        users::{ImageUploadResponse, UpdateProfileRequest, UserList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Address, User},
    response::ApiResponse,
    routes::{
        extract::{AppJson, AppMultipart, AppPath, AppQuery},
        multipart::{ImageForm, image_field},
        params::Pagination,
    },
    services::{address_service, auth_service, user_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/all-users", get(all_users))
        .route("/update-profile", put(update_profile))
        .route("/upload-profile", post(upload_profile))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/address", post(add_address))
        .route("/addresses", get(list_addresses))
        .route(
            "/address/{id}",
            get(get_address).put(update_address).delete(delete_address),
        )
}

#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<User>),
        (status = 400, description = "User already exists or invalid input")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = auth_service::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/user/me",
    responses((status = 200, description = "Current user", body = ApiResponse<User>)),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/user/all-users",
    params(Pagination),
    responses(
        (status = 200, description = "All users", body = ApiResponse<UserList>),
        (status = 403, description = "Access denied")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn all_users(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = user_service::list_users(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/user/update-profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated profile", body = ApiResponse<User>)),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/user/upload-profile",
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded profile image", body = ApiResponse<ImageUploadResponse>),
        (status = 400, description = "Missing or unsupported image")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn upload_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppMultipart(multipart): AppMultipart,
) -> AppResult<Json<ApiResponse<ImageUploadResponse>>> {
    let image = image_field(multipart).await?;
    let resp = user_service::upload_profile_image(&state, &user, image).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/user/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "OTP mailed"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/user/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired OTP")
    ),
    tag = "Users"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/user/address",
    request_body = CreateAddressRequest,
    responses((status = 201, description = "Address added", body = ApiResponse<AddressList>)),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn add_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateAddressRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AddressList>>)> {
    let resp = address_service::add_address(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/user/addresses",
    responses((status = 200, description = "Saved addresses", body = ApiResponse<AddressList>)),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = address_service::list_addresses(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/user/address/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Address", body = ApiResponse<Address>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn get_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let resp = address_service::get_address(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/user/address/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    request_body = UpdateAddressRequest,
    responses(
        (status = 200, description = "Address updated", body = ApiResponse<AddressList>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateAddressRequest>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = address_service::update_address(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/user/address/{id}",
    params(("id" = Uuid, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Address deleted", body = ApiResponse<AddressList>),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Addresses"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<AddressList>>> {
    let resp = address_service::delete_address(&state, &user, id).await?;
    Ok(Json(resp))
}
