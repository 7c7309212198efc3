use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    /// Medical record number, assigned out of band.
    pub mrn: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public-facing slice of a patient account, safe to return to clinicians.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PatientProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub mrn: Option<String>,
}
