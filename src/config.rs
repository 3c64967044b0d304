//! Environment-backed configuration.

use std::env;

use crate::models::EnsembleWeights;
use crate::series::QuarterBoundary;

/// Deployment environment name, used by logging to pick a formatter.
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend_base_url: String,
    pub n_quarters: u32,
    pub weights: EnsembleWeights,
    pub quarter_boundary: QuarterBoundary,
    /// Container labels excluded from the entity dimension.
    pub excluded_entities: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            backend_base_url: "http://localhost:5000".to_string(),
            n_quarters: 8,
            weights: EnsembleWeights::default(),
            quarter_boundary: QuarterBoundary::default(),
            excluded_entities: vec!["Mishap Report".to_string(), "Near Miss".to_string()],
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT", defaults.port),
            backend_base_url: env::var("BACKEND_BASE_URL")
                .unwrap_or(defaults.backend_base_url),
            n_quarters: env_parse("N_QUARTERS", defaults.n_quarters),
            weights: EnsembleWeights {
                w_rf: env_parse("W_RF", defaults.weights.w_rf),
                w_gb: env_parse("W_GB", defaults.weights.w_gb),
            },
            quarter_boundary: match env::var("QUARTER_BOUNDARY").as_deref() {
                Ok("include_current") => QuarterBoundary::IncludeCurrent,
                _ => QuarterBoundary::ExcludeCurrent,
            },
            excluded_entities: match env::var("EXCLUDED_ENTITIES") {
                Ok(raw) => raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
                Err(_) => defaults.excluded_entities,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
