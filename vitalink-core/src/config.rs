use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct VitalinkConfig {
    pub database: DatabaseConfig,
    pub scoring: ScoringConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret. Empty means "read VITALINK_JWT_SECRET from env".
    #[serde(default)]
    pub token_secret: String,
    pub token_ttl_hours: u64,
}

impl AuthConfig {
    /// Resolve the signing secret, preferring the config value over the env var.
    pub fn secret(&self) -> String {
        if !self.token_secret.is_empty() {
            return self.token_secret.clone();
        }
        std::env::var("VITALINK_JWT_SECRET").unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl VitalinkConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}
