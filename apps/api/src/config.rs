use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::candidates::{DateSource, DefaultsPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Json => "json",
            StoreBackend::Postgres => "postgres",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Ok(StoreBackend::Json),
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            other => bail!("unknown STORE_BACKEND '{other}' (expected 'json' or 'postgres')"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub data_path: PathBuf,
    /// Only read when `store_backend` is Postgres.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub policy: DefaultsPolicy,
    pub score_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = DefaultsPolicy::default();
        let policy = DefaultsPolicy {
            score_min: optional_env("DEFAULT_SCORE_MIN")?.unwrap_or(defaults.score_min),
            score_max: optional_env("DEFAULT_SCORE_MAX")?.unwrap_or(defaults.score_max),
            default_status: optional_env("DEFAULT_STATUS")?.unwrap_or(defaults.default_status),
            placeholder_skill: optional_env("PLACEHOLDER_SKILL")?
                .unwrap_or(defaults.placeholder_skill),
            default_source: optional_env("DEFAULT_SOURCE")?,
            date_source: DateSource::System,
        };
        policy
            .validate()
            .context("Invalid DEFAULT_* configuration")?;

        Ok(Config {
            store_backend: optional_env("STORE_BACKEND")?.unwrap_or(StoreBackend::Json),
            data_path: optional_env("DATA_PATH")?
                .unwrap_or_else(|| PathBuf::from("data/candidates.json")),
            database_url: optional_env("DATABASE_URL")?,
            port: optional_env("PORT")?.unwrap_or(3001),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            policy,
            score_seed: optional_env("SCORE_SEED")?,
        })
    }
}

/// Reads and parses an optional variable. Unset or blank yields `None`.
fn optional_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Environment variable '{key}' is invalid: {e}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("JSON".parse::<StoreBackend>().unwrap(), StoreBackend::Json);
        assert_eq!("pg".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("mongo".parse::<StoreBackend>().is_err());
        assert_eq!(
            StoreBackend::Postgres.as_str().parse::<StoreBackend>().unwrap(),
            StoreBackend::Postgres
        );
    }

    #[test]
    fn test_optional_env_unset_and_invalid() {
        std::env::remove_var("TALENT_CRM_TEST_UNSET");
        assert_eq!(optional_env::<u16>("TALENT_CRM_TEST_UNSET").unwrap(), None);

        std::env::set_var("TALENT_CRM_TEST_PORT", "not-a-port");
        let err = optional_env::<u16>("TALENT_CRM_TEST_PORT").unwrap_err();
        assert!(err.to_string().contains("TALENT_CRM_TEST_PORT"), "{err}");
        std::env::remove_var("TALENT_CRM_TEST_PORT");
    }
}
