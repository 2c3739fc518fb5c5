use actix_web::{get, post, put, web, HttpResponse};
use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::auth::{sign_token, AuthenticatedUser};
use crate::models::User;
use crate::routes::{created, ok};
use crate::types::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::AppState;

#[post("/register")]
pub async fn register(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();

    if request.name.trim().is_empty() || request.email.trim().is_empty() {
        return Err(ApiError::Validation(
            "Name and email are required".to_string(),
        ));
    }
    if request.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(request.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {e}")))?
        .to_string();

    let user = match User::create(
        &app_state.pool,
        request.name.trim(),
        request.email.trim(),
        &password_hash,
        request.role,
    )
    .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    // Optional profile fields supplied at signup
    let has_extras = request.age.is_some()
        || request.gender.is_some()
        || request.specialty.is_some()
        || request.hospital.is_some()
        || request.phone.is_some();
    let user = if has_extras {
        User::update_profile(
            &app_state.pool,
            user.id,
            None,
            None,
            None,
            request.age,
            request.gender.as_deref(),
            request.specialty.as_deref(),
            request.hospital.as_deref(),
            request.phone.as_deref(),
        )
        .await?
    } else {
        user
    };

    let token = sign_token(&app_state.config, user.id, user.role)
        .map_err(|e| ApiError::Internal(anyhow!("token signing failed: {e}")))?;

    Ok(created(json!({ "token": token, "user": user })))
}

#[post("/login")]
pub async fn login(
    app_state: web::Data<Arc<AppState>>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = User::get_by_email(&app_state.pool, request.email.trim())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| ApiError::Internal(anyhow!("stored password hash is invalid: {e}")))?;

    Argon2::default()
        .verify_password(request.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let token = sign_token(&app_state.config, user.id, user.role)
        .map_err(|e| ApiError::Internal(anyhow!("token signing failed: {e}")))?;

    Ok(ok(json!({ "token": token, "user": user })))
}

#[get("/me")]
pub async fn me(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = User::get_by_id(&app_state.pool, authenticated_user.user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    Ok(ok(user))
}

#[put("/profile")]
pub async fn update_profile(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = request.into_inner();

    let user = User::update_profile(
        &app_state.pool,
        authenticated_user.user_id,
        request.name.as_deref(),
        request.profile_image.as_deref(),
        request.bio.as_deref(),
        request.age,
        request.gender.as_deref(),
        request.specialty.as_deref(),
        request.hospital.as_deref(),
        request.phone.as_deref(),
    )
    .await?;

    Ok(ok(user))
}
