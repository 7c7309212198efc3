//! Vitals repository — persistence and reads for pulse-check rows.
//!
//! The write path is behind the [`VitalsStore`] trait so the pipeline can be
//! exercised with fakes; everything else is plain query functions over the
//! pool. A reading row is only ever inserted whole, after scoring succeeded,
//! and is never updated afterwards.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use vitalink_core::models::{VitalsPoint, VitalsReading};
use vitalink_core::sanitize::CleanReading;
use vitalink_core::scoring::ScoreResult;
use vitalink_core::VitalinkError;

/// Write-side abstraction for the pulse-check pipeline.
#[async_trait]
pub trait VitalsStore: Send + Sync {
    /// Insert exactly one reading row and return the stored representation,
    /// including the generated id and timestamp.
    async fn insert_reading(
        &self,
        patient_id: Uuid,
        reading: &CleanReading,
        score: &ScoreResult,
    ) -> Result<VitalsReading, VitalinkError>;
}

/// Postgres-backed store.
pub struct PgVitalsStore {
    pool: PgPool,
}

impl PgVitalsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VitalsStore for PgVitalsStore {
    async fn insert_reading(
        &self,
        patient_id: Uuid,
        reading: &CleanReading,
        score: &ScoreResult,
    ) -> Result<VitalsReading, VitalinkError> {
        let row: VitalsReading = sqlx::query_as(
            r#"
            INSERT INTO patients_vitals
                (user_id, mood, systolic, diastolic, heart_rate, sp_o2, weight,
                 symptoms_text, health_score, insight_text, symptom_tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(patient_id)
        .bind(reading.mood)
        .bind(reading.systolic)
        .bind(reading.diastolic)
        .bind(reading.heart_rate)
        .bind(reading.sp_o2)
        .bind(reading.weight)
        .bind(reading.symptoms.as_deref())
        .bind(score.health_score)
        .bind(&score.insight)
        .bind(serde_json::json!(score.symptom_tags))
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}

/// Newest reading for a patient, if any.
pub async fn latest_reading(
    pool: &PgPool,
    patient_id: Uuid,
) -> Result<Option<VitalsReading>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM patients_vitals WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(patient_id)
    .fetch_optional(pool)
    .await
}

/// Trend window for charts: raw vitals over the last `days`, oldest first.
pub async fn history(
    pool: &PgPool,
    patient_id: Uuid,
    days: i32,
) -> Result<Vec<VitalsPoint>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT systolic, diastolic, heart_rate, sp_o2, weight, created_at
        FROM patients_vitals
        WHERE user_id = $1 AND created_at >= NOW() - ($2 * INTERVAL '1 day')
        ORDER BY created_at ASC
        "#,
    )
    .bind(patient_id)
    .bind(days)
    .fetch_all(pool)
    .await
}

/// Complete reading history, newest first. Concurrent submissions are
/// independent rows; this ordering is the only display guarantee.
pub async fn full_history(
    pool: &PgPool,
    patient_id: Uuid,
) -> Result<Vec<VitalsReading>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM patients_vitals WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(patient_id)
        .fetch_all(pool)
        .await
}
