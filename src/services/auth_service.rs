use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::record_audit,
    config::JwtConfig,
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest, UserSummary,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult, is_unique_violation},
    middleware::access::Role,
    models::User,
    response::{ApiResponse, Meta},
    services::mail_service::password_reset_mail,
    state::AppState,
};

pub const OTP_VALID_MINUTES: i64 = 10;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const DEFAULT_PROFILE_IMAGE: &str = "https://cdn-icons-png.flaticon.com/512/3135/3135715.png";

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn issue_token(jwt: &JwtConfig, user_id: Uuid, role: &str) -> AppResult<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(jwt.ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(jwt: &JwtConfig, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100000..=999999).to_string()
}

/// A stored OTP matches only when the code is equal and not yet expired.
pub fn otp_is_valid(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    given: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored, expires_at) {
        (Some(code), Some(expires_at)) => code == given.trim() && expires_at > now,
        _ => false,
    }
}

async fn find_by_email(state: &AppState, email: &str) -> AppResult<Option<UserModel>> {
    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(state.db())
        .await?;
    Ok(user)
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;
    let name = name.trim().to_string();
    let email = normalize_email(&email);
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    validate_password(&password)?;

    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(Role::User.to_string()),
        profile_image: Set(DEFAULT_PROFILE_IMAGE.to_string()),
        phone: Set(None),
        gender: Set(None),
        reset_otp: Set(None),
        reset_otp_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(state.db())
    .await
    .map_err(|err| {
        // Lost the race against a concurrent registration.
        if is_unique_violation(&err) {
            AppError::BadRequest("User already exists".into())
        } else {
            err.into()
        }
    })?;

    record_audit(
        state.db(),
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User registered successfully",
        User::from(user),
        None,
    ))
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let email = normalize_email(&email);

    let user = match find_by_email(state, &email).await? {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = issue_token(&state.jwt, user.id, &user.role)?;

    record_audit(
        state.db(),
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let resp = LoginResponse {
        token,
        user: UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
    };
    Ok(ApiResponse::success("Login successful", resp, Some(Meta::empty())))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    let user = match find_by_email(state, &email).await? {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };

    let otp = generate_otp();
    let expires_at = Utc::now() + Duration::minutes(OTP_VALID_MINUTES);

    let user_id = user.id;
    let to = user.email.clone();
    let mut active: UserActive = user.into();
    active.reset_otp = Set(Some(otp.clone()));
    active.reset_otp_expires_at = Set(Some(expires_at.into()));
    active.updated_at = Set(Utc::now().into());
    active.update(state.db()).await?;

    state
        .mailer
        .send(password_reset_mail(&to, &otp, OTP_VALID_MINUTES))
        .await?;
    tracing::info!(%user_id, "password reset OTP issued");

    Ok(ApiResponse::success(
        "OTP sent to your email.",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    let invalid = || AppError::BadRequest("Invalid or expired OTP".into());

    let user = find_by_email(state, &email).await?.ok_or_else(invalid)?;
    let expires_at = user.reset_otp_expires_at.map(|dt| dt.with_timezone(&Utc));
    if !otp_is_valid(user.reset_otp.as_deref(), expires_at, &payload.otp, Utc::now()) {
        return Err(invalid());
    }
    validate_password(&payload.new_password)?;

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.reset_otp = Set(None);
    active.reset_otp_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(state.db()).await?;

    record_audit(
        state.db(),
        user_id,
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password has been reset successfully!",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: 1,
        }
    }

    #[test]
    fn token_round_trips_identity() {
        let user_id = Uuid::new_v4();
        let token = issue_token(&jwt(), user_id, "admin").unwrap();
        let claims = decode_token(&jwt(), &token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&jwt(), Uuid::new_v4(), "user").unwrap();
        let other = JwtConfig {
            secret: "other".into(),
            ttl_hours: 1,
        };
        assert!(matches!(
            decode_token(&other, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: -2,
        };
        let token = issue_token(&expired, Uuid::new_v4(), "user").unwrap();
        assert!(decode_token(&jwt(), &token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..20 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn otp_validity_checks_code_and_expiry() {
        let now = Utc::now();
        let later = now + Duration::minutes(OTP_VALID_MINUTES);
        assert!(otp_is_valid(Some("123456"), Some(later), "123456", now));
        assert!(!otp_is_valid(Some("123456"), Some(later), "654321", now));
        assert!(!otp_is_valid(Some("123456"), Some(now - Duration::seconds(1)), "123456", now));
        assert!(!otp_is_valid(None, None, "123456", now));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
