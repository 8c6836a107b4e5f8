use std::env;

use crate::services::intent::DEFAULT_FAQ_THRESHOLD;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Shared secret expected in `x-vapi-secret`; empty disables the check.
    pub webhook_secret: String,
    pub faq_similarity_threshold: f64,
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            database_url: "dental_voice.db".to_string(),
            admin_token: "changeme".to_string(),
            webhook_secret: String::new(),
            faq_similarity_threshold: DEFAULT_FAQ_THRESHOLD,
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or(defaults.admin_token),
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            faq_similarity_threshold: env::var("FAQ_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|v| parse_threshold(&v))
                .unwrap_or(defaults.faq_similarity_threshold),
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        Some(self.webhook_secret.as_str()).filter(|s| !s.is_empty())
    }
}

fn parse_threshold(raw: &str) -> Option<f64> {
    let threshold = raw.trim().parse::<f64>().ok().filter(|t| t.is_finite());
    if threshold.is_none() {
        tracing::warn!(value = raw, "ignoring invalid FAQ_SIMILARITY_THRESHOLD");
    }
    threshold
}
