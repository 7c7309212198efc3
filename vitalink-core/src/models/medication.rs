use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub prescribed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Medication plus the newest entry from its append-only adherence log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MedicationWithAdherence {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub last_taken: Option<DateTime<Utc>>,
}

/// One "taken" event. Rows are appended, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdherenceLogEntry {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub taken_at: DateTime<Utc>,
}
