//! Medication queries: prescriptions plus the append-only adherence log.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use vitalink_core::models::{AdherenceLogEntry, Medication, MedicationWithAdherence};

#[derive(Error, Debug)]
pub enum MedicationError {
    /// The medication exists but belongs to another patient.
    #[error("Medication does not belong to this patient")]
    NotOwned,

    #[error("Medication not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A patient's medications with the most recent "taken" timestamp from the
/// adherence log, newest prescription first.
pub async fn list_for_patient(
    pool: &PgPool,
    patient_id: Uuid,
) -> Result<Vec<MedicationWithAdherence>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            m.id, m.name, m.dosage, m.frequency,
            (SELECT taken_at FROM medication_adherence_log mal
             WHERE mal.medication_id = m.id
             ORDER BY mal.taken_at DESC LIMIT 1) AS last_taken
        FROM medications m
        WHERE m.user_id = $1
        ORDER BY m.created_at DESC
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await
}

/// Same listing ordered by name, for the clinician detail view.
pub async fn list_for_patient_by_name(
    pool: &PgPool,
    patient_id: Uuid,
) -> Result<Vec<MedicationWithAdherence>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            m.id, m.name, m.dosage, m.frequency,
            (SELECT taken_at FROM medication_adherence_log mal
             WHERE mal.medication_id = m.id
             ORDER BY mal.taken_at DESC LIMIT 1) AS last_taken
        FROM medications m
        WHERE m.user_id = $1
        ORDER BY m.name
        "#,
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await
}

/// Append one "taken" event. Verifies ownership first so a patient cannot
/// log against someone else's prescription.
pub async fn log_taken(
    pool: &PgPool,
    medication_id: Uuid,
    patient_id: Uuid,
) -> Result<AdherenceLogEntry, MedicationError> {
    let owner: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM medications WHERE id = $1")
            .bind(medication_id)
            .fetch_optional(pool)
            .await?;

    match owner {
        None => return Err(MedicationError::NotFound),
        Some((owner_id,)) if owner_id != patient_id => return Err(MedicationError::NotOwned),
        Some(_) => {}
    }

    let entry: AdherenceLogEntry = sqlx::query_as(
        "INSERT INTO medication_adherence_log (medication_id) VALUES ($1) RETURNING *",
    )
    .bind(medication_id)
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

/// Insert a new prescription for a patient, recording the prescribing
/// clinician.
pub async fn prescribe(
    pool: &PgPool,
    patient_id: Uuid,
    clinician_id: Uuid,
    name: &str,
    dosage: &str,
    frequency: &str,
) -> Result<Medication, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO medications (user_id, prescribed_by, name, dosage, frequency)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(patient_id)
    .bind(clinician_id)
    .bind(name)
    .bind(dosage)
    .bind(frequency)
    .fetch_one(pool)
    .await
}
