use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::embedding::Pooling;
use crate::errors::AnalysisError;
use crate::screening::skills::parse_skill_list;

/// Skills looked for when the caller does not supply a vocabulary.
pub const DEFAULT_SKILLS: &[&str] = &[
    "python",
    "sql",
    "machine learning",
    "deep learning",
    "tensorflow",
    "pytorch",
    "sklearn",
    "nlp",
    "computer vision",
    "aws",
    "azure",
    "gcp",
    "pandas",
    "numpy",
];

/// Tunables for one analysis run. Validated before any pipeline work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Fusion weight: `final = alpha * semantic + (1 - alpha) * coverage`.
    pub alpha: f64,
    /// Number of keyphrases extracted from the job description.
    pub top_n: usize,
    /// Maximum chunk length in characters for document embedding.
    pub max_chunk_len: usize,
    pub pooling: Pooling,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            top_n: 20,
            max_chunk_len: 300,
            pooling: Pooling::Mean,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.alpha.is_finite() || !(0.0..=1.0).contains(&self.alpha) {
            return Err(AnalysisError::InvalidConfig(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        if self.top_n == 0 {
            return Err(AnalysisError::InvalidConfig(
                "top_n must be at least 1".to_string(),
            ));
        }
        if self.max_chunk_len == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_chunk_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-request overrides of the server defaults. Pooling stays a string here
/// so an unknown keyword is reported with the caller's spelling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisOptions {
    pub alpha: Option<f64>,
    pub top_n: Option<usize>,
    pub max_chunk_len: Option<usize>,
    pub pooling: Option<String>,
}

impl AnalysisOptions {
    pub fn resolve(&self, defaults: &AnalysisSettings) -> Result<AnalysisSettings, AnalysisError> {
        let pooling = match self.pooling.as_deref() {
            Some(raw) => raw.parse::<Pooling>()?,
            None => defaults.pooling,
        };
        let settings = AnalysisSettings {
            alpha: self.alpha.unwrap_or(defaults.alpha),
            top_n: self.top_n.unwrap_or(defaults.top_n),
            max_chunk_len: self.max_chunk_len.unwrap_or(defaults.max_chunk_len),
            pooling,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Embedding backend settings. With no `api_url` the offline hashing encoder
/// is used.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
    /// Retries per batch after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            batch_size: 64,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values abort startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub embedding: EmbeddingSettings,
    pub analysis: AnalysisSettings,
    pub default_skills: Vec<String>,
    pub candidate_concurrency: usize,
    pub candidate_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            embedding: EmbeddingSettings::default(),
            analysis: AnalysisSettings::default(),
            default_skills: DEFAULT_SKILLS.iter().map(|s| s.to_string()).collect(),
            candidate_concurrency: 4,
            candidate_timeout: Duration::from_secs(60),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        let embedding = EmbeddingSettings {
            api_url: optional_env("EMBEDDING_API_URL"),
            api_key: optional_env("EMBEDDING_API_KEY"),
            model: optional_env("EMBEDDING_MODEL").unwrap_or(defaults.embedding.model),
            dimension: parse_env("EMBEDDING_DIMENSION", defaults.embedding.dimension)?,
            timeout: Duration::from_secs(parse_env(
                "EMBEDDING_TIMEOUT_SECS",
                defaults.embedding.timeout.as_secs(),
            )?),
            max_retries: parse_env("EMBEDDING_MAX_RETRIES", defaults.embedding.max_retries)?,
            batch_size: parse_env("EMBEDDING_BATCH_SIZE", defaults.embedding.batch_size)?,
        };
        anyhow::ensure!(embedding.dimension > 0, "EMBEDDING_DIMENSION must be positive");

        let analysis = AnalysisSettings {
            alpha: parse_env("MATCH_ALPHA", defaults.analysis.alpha)?,
            top_n: parse_env("KEYPHRASE_TOP_N", defaults.analysis.top_n)?,
            max_chunk_len: parse_env("MAX_CHUNK_LEN", defaults.analysis.max_chunk_len)?,
            pooling: parse_env("POOLING", defaults.analysis.pooling)?,
        };
        analysis
            .validate()
            .context("Invalid analysis defaults in environment")?;

        let default_skills = match optional_env("DEFAULT_SKILLS") {
            Some(raw) => parse_skill_list(&raw),
            None => defaults.default_skills,
        };

        let candidate_concurrency: usize =
            parse_env("CANDIDATE_CONCURRENCY", defaults.candidate_concurrency)?;
        let max_upload_mb: usize =
            parse_env("MAX_UPLOAD_MB", defaults.max_upload_bytes / (1024 * 1024))?;

        Ok(Config {
            port: parse_env("PORT", defaults.port)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            embedding,
            analysis,
            default_skills,
            candidate_concurrency: candidate_concurrency.max(1),
            candidate_timeout: Duration::from_secs(parse_env(
                "CANDIDATE_TIMEOUT_SECS",
                defaults.candidate_timeout.as_secs(),
            )?),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = AnalysisSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.alpha, 0.7);
        assert_eq!(settings.top_n, 20);
        assert_eq!(settings.max_chunk_len, 300);
        assert_eq!(settings.pooling, Pooling::Mean);
    }

    #[test]
    fn test_alpha_out_of_range_is_rejected() {
        for alpha in [-0.1, 1.5, f64::NAN] {
            let settings = AnalysisSettings {
                alpha,
                ..AnalysisSettings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(AnalysisError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_zero_top_n_and_chunk_len_are_rejected() {
        let zero_top_n = AnalysisSettings {
            top_n: 0,
            ..AnalysisSettings::default()
        };
        assert!(zero_top_n.validate().is_err());

        let zero_chunk = AnalysisSettings {
            max_chunk_len: 0,
            ..AnalysisSettings::default()
        };
        assert!(zero_chunk.validate().is_err());
    }

    #[test]
    fn test_options_override_defaults() {
        let options = AnalysisOptions {
            alpha: Some(0.5),
            top_n: None,
            max_chunk_len: Some(120),
            pooling: Some("max".to_string()),
        };
        let settings = options.resolve(&AnalysisSettings::default()).unwrap();
        assert_eq!(settings.alpha, 0.5);
        assert_eq!(settings.top_n, 20);
        assert_eq!(settings.max_chunk_len, 120);
        assert_eq!(settings.pooling, Pooling::Max);
    }

    #[test]
    fn test_options_reject_unknown_pooling() {
        let options = AnalysisOptions {
            pooling: Some("attention".to_string()),
            ..AnalysisOptions::default()
        };
        let err = options.resolve(&AnalysisSettings::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownPooling(ref p) if p == "attention"));
    }

    #[test]
    fn test_options_reject_invalid_alpha() {
        let options = AnalysisOptions {
            alpha: Some(2.0),
            ..AnalysisOptions::default()
        };
        assert!(options.resolve(&AnalysisSettings::default()).is_err());
    }

    #[test]
    fn test_default_config_uses_default_skills() {
        let config = Config::default();
        assert_eq!(config.default_skills.len(), DEFAULT_SKILLS.len());
        assert!(config.default_skills.contains(&"machine learning".to_string()));
        assert!(config.embedding.api_url.is_none());
    }
}
