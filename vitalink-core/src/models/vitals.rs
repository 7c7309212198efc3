use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted pulse check. Immutable once written; every numeric field is
/// either a parsed value or an explicit null, and the derived fields
/// (health_score, insight_text, symptom_tags) are always present because a
/// row is only inserted after scoring succeeds.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VitalsReading {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood: Option<i32>,
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub sp_o2: Option<i32>,
    pub weight: Option<f64>,
    pub symptoms_text: Option<String>,
    pub health_score: f64,
    pub insight_text: String,
    pub symptom_tags: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Trend point for the 30-day history endpoint — raw vitals only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VitalsPoint {
    pub systolic: Option<i32>,
    pub diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub sp_o2: Option<i32>,
    pub weight: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Roster row for the clinician dashboard: one assigned patient with their
/// most recent score, if any.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConstellationEntry {
    pub id: Uuid,
    pub full_name: String,
    pub mrn: Option<String>,
    pub health_score: Option<f64>,
    pub last_checkin: Option<DateTime<Utc>>,
}
