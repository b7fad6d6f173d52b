// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, NewUser, ROLE_USER},
    store::UserDirectory,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user with role 'user'.
///
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(users): State<Arc<dyn UserDirectory>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let username = payload.username.trim().to_string();
    let hashed_password = hash_password(&payload.password)?;

    let user = users
        .create_user(NewUser {
            username: username.clone(),
            password_hash: hashed_password,
            role: ROLE_USER.to_string(),
            profile: payload.profile,
        })
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Username '{}' already exists", username)))?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(users): State<Arc<dyn UserDirectory>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invalid = || AppError::AuthError("Invalid username or password".to_string());

    let user = users
        .find_by_username(payload.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": config.jwt_expiration,
        "role": user.role,
    })))
}

/// Profile of the authenticated user.
pub async fn me(
    State(users): State<Arc<dyn UserDirectory>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users
        .get_user(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
