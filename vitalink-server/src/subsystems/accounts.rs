//! Account registration and login.
//!
//! Credential checks deliberately collapse "unknown email" and "wrong
//! password" into one rejection so the login endpoint leaks nothing about
//! which accounts exist.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use vitalink_core::auth::{hash_password, verify_password, Role};
use vitalink_core::models::User;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AccountError> {
    if req.full_name.trim().is_empty() {
        return Err(AccountError::Validation("Full name is required".to_string()));
    }
    if !req.email.contains('@') || req.email.trim().len() < 3 {
        return Err(AccountError::Validation(
            "Please include a valid email".to_string(),
        ));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "Please enter a password with {} or more characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Create a patient account and return it. Clinician accounts are
/// provisioned out of band, not through self-registration.
pub async fn register(pool: &PgPool, req: &RegisterRequest) -> Result<User, AccountError> {
    validate_registration(req)?;

    let existing: Option<(uuid::Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(&req.email)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (full_name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(req.full_name.trim())
    .bind(&req.email)
    .bind(hash_password(&req.password))
    .bind(Role::Patient)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = %user.id, "Registered new patient account");
    Ok(user)
}

/// Verify credentials and return the account.
pub async fn login(pool: &PgPool, req: &LoginRequest) -> Result<User, AccountError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(pool)
        .await?;

    let user = user.ok_or(AccountError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AccountError::InvalidCredentials);
    }

    Ok(user)
}
