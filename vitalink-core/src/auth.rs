//! Bearer token issuing and verification, plus password hashing.
//!
//! Tokens are HS256-signed JWTs carrying the user id and role. The HTTP
//! layer treats them as opaque: it hands the header value to
//! [`verify_token`] and gets back an [`AuthUser`] or a rejection.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Roles
// ============================================================================

/// Closed set of account roles. Role checks match on this enum exhaustively;
/// raw role strings never travel beyond the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Clinician,
}

// Stored as TEXT; delegate the sqlx plumbing to &str.
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Clinician => "clinician",
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "clinician" => Ok(Role::Clinician),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated principal resolved from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Signing secret is not configured")]
    MissingSecret,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid credentials")]
    InvalidCredentials,
}

// ============================================================================
// Token claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    exp: i64,
}

/// Issue a signed bearer token for the user, valid for `ttl_hours`.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: Role,
    ttl_hours: u64,
) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(ttl_hours as i64)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify a bearer token and resolve the authenticated user.
pub fn verify_token(secret: &str, token: &str) -> Result<AuthUser, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(AuthUser {
        id: data.claims.sub,
        role: data.claims.role,
    })
}

// ============================================================================
// Password hashing — salted SHA-256, stored as "salt$digest" hex
// ============================================================================

pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    let salt_hex = hex_encode(&salt);
    format!("{}${}", salt_hex, digest_hex(&salt_hex, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest)) = stored.split_once('$') else {
        return false;
    };
    digest_hex(salt_hex, password) == digest
}

fn digest_hex(salt_hex: &str, password: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, Role::Clinician, 5).unwrap();
        let user = verify_token(SECRET, &token).unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Clinician);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = issue_token(SECRET, Uuid::new_v4(), Role::Patient, 5).unwrap();
        let result = verify_token("other-secret", &token);
        assert!(matches!(result, Err(AuthError::Token(_))));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let result = verify_token(SECRET, "not-a-token");
        assert!(matches!(result, Err(AuthError::Token(_))));
    }

    #[test]
    fn test_empty_secret_refused() {
        assert!(matches!(
            issue_token("", Uuid::new_v4(), Role::Patient, 5),
            Err(AuthError::MissingSecret)
        ));
        assert!(matches!(
            verify_token("", "whatever"),
            Err(AuthError::MissingSecret)
        ));
    }

    #[test]
    fn test_role_parsing_is_closed() {
        assert_eq!(Role::from_str("patient").unwrap(), Role::Patient);
        assert_eq!(Role::from_str("clinician").unwrap(), Role::Clinician);
        assert!(matches!(
            Role::from_str("admin"),
            Err(AuthError::UnknownRole(_))
        ));
    }

    #[test]
    fn test_password_hash_verifies_and_salts() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));

        // A second hash of the same password must use a different salt.
        let stored2 = hash_password("hunter22");
        assert_ne!(stored, stored2);
        assert!(verify_password("hunter22", &stored2));
    }

    #[test]
    fn test_malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "no-separator-here"));
    }
}
