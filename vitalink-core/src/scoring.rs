//! Scoring client — talks to the external health-scoring service.
//!
//! Two independent calls live here:
//! - **score** — synchronous scoring of a single sanitized reading. The
//!   pipeline must not persist a reading without a real score, so failures
//!   and timeouts propagate to the caller.
//! - **trigger_baseline_update** — asks the service to recompute the
//!   patient's personal baseline from accumulated history. The orchestrator
//!   dispatches this off the critical path and only logs failures.
//!
//! Neither call is retried; a failed submission requires the user to resubmit.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::sanitize::CleanReading;

// ============================================================================
// ScoringBackend trait
// ============================================================================

/// Abstraction over the scoring service so the pipeline can run against fakes.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    /// Score a sanitized reading for the given patient.
    async fn score(
        &self,
        patient_id: Uuid,
        reading: &CleanReading,
    ) -> Result<ScoreResult, ScoringError>;

    /// Request an asynchronous baseline recompute for the patient.
    /// The response body carries nothing the caller needs.
    async fn trigger_baseline_update(&self, patient_id: Uuid) -> Result<(), ScoringError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Derived result for one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub health_score: f64,
    pub insight: String,
    pub symptom_tags: Vec<String>,
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scoring service error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed scoring response: {0}")]
    MalformedResponse(String),
}

// ============================================================================
// Wire structs (private) — camelCase, matching the scoring service API
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRequest<'a> {
    user_id: Uuid,
    #[serde(flatten)]
    reading: &'a CleanReading,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateResponse {
    health_score: f64,
    insight: String,
    #[serde(default)]
    symptom_tags: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaselineRequest {
    user_id: Uuid,
}

// ============================================================================
// HttpScoringClient
// ============================================================================

/// Production scoring backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScoringClient {
    client: Client,
    base_url: String,
}

impl HttpScoringClient {
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        Self::with_base_url(config, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: &ScoringConfig, base_url: String) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn score_once(
        &self,
        patient_id: Uuid,
        reading: &CleanReading,
    ) -> Result<ScoreResult, ScoringError> {
        let url = format!("{}/api/calculate", self.base_url);
        let request = CalculateRequest {
            user_id: patient_id,
            reading,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), message = %message, "Scoring service error");
            return Err(ScoringError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: CalculateResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::MalformedResponse(e.to_string()))?;

        if !body.health_score.is_finite() {
            return Err(ScoringError::MalformedResponse(
                "healthScore is not a finite number".to_string(),
            ));
        }

        Ok(ScoreResult {
            health_score: body.health_score,
            insight: body.insight,
            symptom_tags: body.symptom_tags,
        })
    }
}

#[async_trait]
impl ScoringBackend for HttpScoringClient {
    async fn score(
        &self,
        patient_id: Uuid,
        reading: &CleanReading,
    ) -> Result<ScoreResult, ScoringError> {
        self.score_once(patient_id, reading).await
    }

    async fn trigger_baseline_update(&self, patient_id: Uuid) -> Result<(), ScoringError> {
        let url = format!("{}/api/update-baseline", self.base_url);
        let request = BaselineRequest {
            user_id: patient_id,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ScoringError::Api {
                code: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> ScoringConfig {
        ScoringConfig {
            base_url: "http://unused.invalid".to_string(),
            timeout_seconds: 2,
        }
    }

    fn sample_reading() -> CleanReading {
        CleanReading {
            mood: Some(4),
            systolic: Some(120),
            diastolic: Some(80),
            heart_rate: None,
            sp_o2: Some(98),
            weight: Some(150.5),
            symptoms: None,
        }
    }

    #[tokio::test]
    async fn test_score_posts_reading_and_parses_result() {
        let mock_server = MockServer::start().await;
        let client =
            HttpScoringClient::with_base_url(&test_config(), mock_server.uri()).unwrap();
        let patient_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/api/calculate"))
            .and(body_partial_json(serde_json::json!({
                "userId": patient_id,
                "mood": 4,
                "systolic": 120,
                "heart_rate": null,
                "weight": 150.5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "healthScore": 88,
                "insight": "Blood pressure is moderately elevated.",
                "symptomTags": ["hypertension"]
            })))
            .mount(&mock_server)
            .await;

        let result = client.score(patient_id, &sample_reading()).await;

        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
        let score = result.unwrap();
        assert_eq!(score.health_score, 88.0);
        assert_eq!(score.insight, "Blood pressure is moderately elevated.");
        assert_eq!(score.symptom_tags, vec!["hypertension".to_string()]);
    }

    #[tokio::test]
    async fn test_score_defaults_missing_symptom_tags_to_empty() {
        let mock_server = MockServer::start().await;
        let client =
            HttpScoringClient::with_base_url(&test_config(), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/calculate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "healthScore": 95,
                "insight": "Patient appears stable."
            })))
            .mount(&mock_server)
            .await;

        let score = client
            .score(Uuid::new_v4(), &sample_reading())
            .await
            .unwrap();
        assert!(score.symptom_tags.is_empty());
    }

    #[tokio::test]
    async fn test_score_returns_error_on_500() {
        let mock_server = MockServer::start().await;
        let client =
            HttpScoringClient::with_base_url(&test_config(), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/calculate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("scorer crashed"))
            .mount(&mock_server)
            .await;

        let result = client.score(Uuid::new_v4(), &sample_reading()).await;

        match result {
            Err(ScoringError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "scorer crashed");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_score_times_out_without_retry() {
        let mock_server = MockServer::start().await;
        let config = ScoringConfig {
            base_url: mock_server.uri(),
            timeout_seconds: 1,
        };
        let client = HttpScoringClient::with_base_url(&config, mock_server.uri()).unwrap();

        // Single expectation: a timed-out call must not be re-sent.
        Mock::given(method("POST"))
            .and(path("/api/calculate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(serde_json::json!({
                        "healthScore": 90,
                        "insight": "too late"
                    })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.score(Uuid::new_v4(), &sample_reading()).await;
        assert!(matches!(result, Err(ScoringError::Http(_))));
    }

    #[tokio::test]
    async fn test_score_rejects_malformed_body() {
        let mock_server = MockServer::start().await;
        let client =
            HttpScoringClient::with_base_url(&test_config(), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/calculate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let result = client.score(Uuid::new_v4(), &sample_reading()).await;
        assert!(matches!(result, Err(ScoringError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_baseline_update_posts_patient_id_only() {
        let mock_server = MockServer::start().await;
        let client =
            HttpScoringClient::with_base_url(&test_config(), mock_server.uri()).unwrap();
        let patient_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/api/update-baseline"))
            .and(body_partial_json(serde_json::json!({ "userId": patient_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "queued": true
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.trigger_baseline_update(patient_id).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_baseline_update_surfaces_error_status() {
        let mock_server = MockServer::start().await;
        let client =
            HttpScoringClient::with_base_url(&test_config(), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .and(path("/api/update-baseline"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let result = client.trigger_baseline_update(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ScoringError::Api { code: 503, .. })));
    }
}
