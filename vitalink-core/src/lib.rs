pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sanitize;
pub mod scoring;

pub use auth::{issue_token, verify_token, AuthError, AuthUser, Role};
pub use config::VitalinkConfig;
pub use error::VitalinkError;
pub use sanitize::{sanitize_pulse_check, CleanReading, RawPulseCheck};
pub use scoring::{HttpScoringClient, ScoreResult, ScoringBackend, ScoringError};
