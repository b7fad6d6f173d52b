// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_USER: &str = "user";

pub const STATUS_ACTIVE: i32 = 1;

/// Roles allowed to manage banks, questions and exams.
pub fn is_staff(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_MANAGER
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user', 'manager' or 'admin'.
    pub role: String,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: UserProfile,

    /// Account status; `STATUS_ACTIVE` for every account created here.
    pub status: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Optional personal details shown on `/api/user/me`. Empty when not given.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    #[validate(length(max = 50))]
    #[serde(default)]
    pub name: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub department: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub job_title: String,
    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: String,
}

/// User row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub profile: UserProfile,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    #[validate(nested)]
    #[serde(flatten)]
    pub profile: UserProfile,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
