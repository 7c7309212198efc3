//! Clinician-facing reads: the assigned-patient roster and per-patient
//! drill-down.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use vitalink_core::models::{ConstellationEntry, MedicationWithAdherence, PatientProfile, VitalsReading};

use super::{medications, vitals};

/// Roster data: every patient assigned to this clinician with their latest
/// health score and check-in time. One row per patient.
pub async fn constellation(
    pool: &PgPool,
    clinician_id: Uuid,
) -> Result<Vec<ConstellationEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT DISTINCT ON (u.id)
            u.id,
            u.full_name,
            u.mrn,
            pv.health_score,
            pv.created_at AS last_checkin
        FROM users u
        JOIN patient_clinician_assignments pca ON u.id = pca.patient_id
        LEFT JOIN patients_vitals pv ON u.id = pv.user_id
        WHERE pca.clinician_id = $1 AND u.role = 'patient'
        ORDER BY u.id, pv.created_at DESC
        "#,
    )
    .bind(clinician_id)
    .fetch_all(pool)
    .await
}

/// Everything the patient detail page needs in one payload.
#[derive(Debug, Serialize)]
pub struct PatientDetail {
    pub profile: PatientProfile,
    pub vitals_history: Vec<VitalsReading>,
    pub medications: Vec<MedicationWithAdherence>,
}

/// Full health-hub data for one patient, or `None` when the id does not
/// resolve to a patient account. The three reads run concurrently.
pub async fn patient_detail(
    pool: &PgPool,
    patient_id: Uuid,
) -> Result<Option<PatientDetail>, sqlx::Error> {
    let profile_fut = sqlx::query_as::<_, PatientProfile>(
        "SELECT id, full_name, email, mrn FROM users WHERE id = $1 AND role = 'patient'",
    )
    .bind(patient_id)
    .fetch_optional(pool);

    let (profile, vitals_history, meds) = futures::try_join!(
        profile_fut,
        vitals::full_history(pool, patient_id),
        medications::list_for_patient_by_name(pool, patient_id),
    )?;

    Ok(profile.map(|profile| PatientDetail {
        profile,
        vitals_history,
        medications: meds,
    }))
}
