//! Pulse-check pipeline orchestrator.
//!
//! Sequencing for one submission:
//! sanitize → score → persist → spawn baseline recompute → return the stored
//! row. Scoring strictly precedes persistence so an unscored row can never be
//! written, and the baseline trigger runs detached after the persist so it
//! can neither delay the response nor roll anything back. Nothing here
//! retries; a failed submission is reported and the patient resubmits.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use vitalink_core::models::VitalsReading;
use vitalink_core::sanitize::{sanitize_pulse_check, RawPulseCheck};
use vitalink_core::scoring::{ScoringBackend, ScoringError};
use vitalink_core::VitalinkError;

use super::vitals::VitalsStore;

#[derive(Error, Debug)]
pub enum PulseCheckError {
    /// The external scorer timed out or rejected the reading. Nothing was
    /// persisted.
    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    /// The write failed after a successful score. The score is discarded,
    /// not cached for retry.
    #[error("Storage failed: {0}")]
    Storage(VitalinkError),
}

/// Run one pulse-check submission end to end.
///
/// Returns the persisted reading as the authoritative result. The baseline
/// recompute is dispatched as a detached task once the row is stored; its
/// errors are logged and never reach the caller.
pub async fn submit_pulse_check(
    patient_id: Uuid,
    raw: RawPulseCheck,
    store: &dyn VitalsStore,
    scorer: &Arc<dyn ScoringBackend>,
) -> Result<VitalsReading, PulseCheckError> {
    let reading = sanitize_pulse_check(&raw);

    let score = scorer.score(patient_id, &reading).await?;

    let stored = store
        .insert_reading(patient_id, &reading, &score)
        .await
        .map_err(PulseCheckError::Storage)?;

    tracing::info!(
        patient_id = %patient_id,
        reading_id = %stored.id,
        health_score = stored.health_score,
        "Pulse check persisted"
    );

    spawn_baseline_update(Arc::clone(scorer), patient_id);

    Ok(stored)
}

/// Fire-and-forget baseline recompute. Errors are logged, not propagated —
/// the user-visible result of the pulse check is already decided.
pub fn spawn_baseline_update(scorer: Arc<dyn ScoringBackend>, patient_id: Uuid) {
    tokio::spawn(async move {
        match scorer.trigger_baseline_update(patient_id).await {
            Ok(()) => tracing::debug!(patient_id = %patient_id, "Baseline update triggered"),
            Err(e) => tracing::warn!(
                patient_id = %patient_id,
                error = %e,
                "Non-blocking baseline update failed"
            ),
        }
    });
}

// ============================================================================
// TESTS — counting fakes verify the ordering contract
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use vitalink_core::sanitize::CleanReading;
    use vitalink_core::scoring::ScoreResult;

    struct FakeStore {
        insert_calls: AtomicUsize,
        fail: bool,
    }

    impl FakeStore {
        fn new(fail: bool) -> Self {
            Self {
                insert_calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl VitalsStore for FakeStore {
        async fn insert_reading(
            &self,
            patient_id: Uuid,
            reading: &CleanReading,
            score: &ScoreResult,
        ) -> Result<VitalsReading, VitalinkError> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(VitalinkError::Other("constraint violation".to_string()));
            }
            Ok(VitalsReading {
                id: Uuid::new_v4(),
                user_id: patient_id,
                mood: reading.mood,
                systolic: reading.systolic,
                diastolic: reading.diastolic,
                heart_rate: reading.heart_rate,
                sp_o2: reading.sp_o2,
                weight: reading.weight,
                symptoms_text: reading.symptoms.clone(),
                health_score: score.health_score,
                insight_text: score.insight.clone(),
                symptom_tags: serde_json::json!(score.symptom_tags),
                created_at: chrono::Utc::now(),
            })
        }
    }

    struct FakeScorer {
        score_calls: AtomicUsize,
        baseline_calls: AtomicUsize,
        fail_score: bool,
        fail_baseline: bool,
    }

    impl FakeScorer {
        fn new(fail_score: bool, fail_baseline: bool) -> Arc<Self> {
            Arc::new(Self {
                score_calls: AtomicUsize::new(0),
                baseline_calls: AtomicUsize::new(0),
                fail_score,
                fail_baseline,
            })
        }
    }

    #[async_trait]
    impl ScoringBackend for FakeScorer {
        async fn score(
            &self,
            _patient_id: Uuid,
            _reading: &CleanReading,
        ) -> Result<ScoreResult, ScoringError> {
            self.score_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_score {
                return Err(ScoringError::Api {
                    code: 500,
                    message: "scorer down".to_string(),
                });
            }
            Ok(ScoreResult {
                health_score: 88.0,
                insight: "Patient appears stable.".to_string(),
                symptom_tags: vec![],
            })
        }

        async fn trigger_baseline_update(&self, _patient_id: Uuid) -> Result<(), ScoringError> {
            self.baseline_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_baseline {
                return Err(ScoringError::Api {
                    code: 503,
                    message: "baseline service down".to_string(),
                });
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn sample_raw() -> RawPulseCheck {
        serde_json::from_value(serde_json::json!({
            "mood": "4",
            "systolic": "120",
            "diastolic": "80",
            "heart_rate": "",
            "sp_o2": "98",
            "weight": "150.5",
            "symptoms": ""
        }))
        .unwrap()
    }

    /// Wait until the baseline counter settles at `expected`, then make sure
    /// it stays there.
    async fn assert_baseline_calls(scorer: &Arc<FakeScorer>, expected: usize) {
        for _ in 0..100 {
            if scorer.baseline_calls.load(Ordering::SeqCst) == expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(scorer.baseline_calls.load(Ordering::SeqCst), expected);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            scorer.baseline_calls.load(Ordering::SeqCst),
            expected,
            "baseline must fire exactly {} time(s)",
            expected
        );
    }

    #[tokio::test]
    async fn test_successful_submission_returns_stored_reading() {
        let store = FakeStore::new(false);
        let scorer = FakeScorer::new(false, false);
        let backend: Arc<dyn ScoringBackend> = scorer.clone();
        let patient_id = Uuid::new_v4();

        let stored = submit_pulse_check(patient_id, sample_raw(), &store, &backend)
            .await
            .expect("submission should succeed");

        assert_eq!(stored.user_id, patient_id);
        assert_eq!(stored.mood, Some(4));
        assert_eq!(stored.heart_rate, None);
        assert_eq!(stored.weight, Some(150.5));
        assert_eq!(stored.health_score, 88.0);
        assert_eq!(stored.insight_text, "Patient appears stable.");
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 1);

        assert_baseline_calls(&scorer, 1).await;
    }

    #[tokio::test]
    async fn test_scoring_failure_never_touches_the_store() {
        let store = FakeStore::new(false);
        let scorer = FakeScorer::new(true, false);
        let backend: Arc<dyn ScoringBackend> = scorer.clone();

        let result = submit_pulse_check(Uuid::new_v4(), sample_raw(), &store, &backend).await;

        assert!(matches!(result, Err(PulseCheckError::Scoring(_))));
        assert_eq!(
            store.insert_calls.load(Ordering::SeqCst),
            0,
            "store must not be invoked when scoring fails"
        );
        assert_baseline_calls(&scorer, 0).await;
    }

    #[tokio::test]
    async fn test_storage_failure_discards_score_and_skips_baseline() {
        let store = FakeStore::new(true);
        let scorer = FakeScorer::new(false, false);
        let backend: Arc<dyn ScoringBackend> = scorer.clone();

        let result = submit_pulse_check(Uuid::new_v4(), sample_raw(), &store, &backend).await;

        assert!(matches!(result, Err(PulseCheckError::Storage(_))));
        assert_eq!(scorer.score_calls.load(Ordering::SeqCst), 1);
        assert_baseline_calls(&scorer, 0).await;
    }

    #[tokio::test]
    async fn test_baseline_failure_does_not_alter_the_response() {
        let store = FakeStore::new(false);
        let scorer = FakeScorer::new(false, true);
        let backend: Arc<dyn ScoringBackend> = scorer.clone();

        let stored = submit_pulse_check(Uuid::new_v4(), sample_raw(), &store, &backend)
            .await
            .expect("baseline failure must not fail the submission");

        assert_eq!(stored.health_score, 88.0);
        assert_baseline_calls(&scorer, 1).await;
    }

    #[tokio::test]
    async fn test_sanitized_values_reach_the_scorer_and_store() {
        // The store fake echoes the reading back, so the stored row doubles
        // as a record of what crossed the trait boundary.
        let store = FakeStore::new(false);
        let scorer = FakeScorer::new(false, false);
        let backend: Arc<dyn ScoringBackend> = scorer.clone();

        let raw: RawPulseCheck = serde_json::from_value(serde_json::json!({
            "mood": 2,
            "systolic": "not a number",
            "symptoms": "dizzy"
        }))
        .unwrap();

        let stored = submit_pulse_check(Uuid::new_v4(), raw, &store, &backend)
            .await
            .unwrap();

        assert_eq!(stored.mood, Some(2));
        assert_eq!(stored.systolic, None);
        assert_eq!(stored.symptoms_text.as_deref(), Some("dizzy"));
    }
}
