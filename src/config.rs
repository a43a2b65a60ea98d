//! Configuration types.
//!
//! Everything is read from the environment. `Config::from_lookup` takes the
//! lookup function explicitly so tests never have to touch process state.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

const DEFAULT_DB_PATH: &str = "./data/nudge.db";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Which duplicate matching strategy regeneration uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupStrategy {
    /// Normalized equality or substring containment.
    Substring,
    /// Token-set overlap ratio at or above `threshold`.
    TokenOverlap { threshold: f64 },
}

impl Default for DedupStrategy {
    fn default() -> Self {
        Self::Substring
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Port the HTTP API listens on.
    pub port: u16,
    /// Directory for daily-rolling log files. Logs go to stderr only when unset.
    pub log_dir: Option<PathBuf>,
    /// LLM provider settings.
    pub llm: LlmConfig,
    /// Bearer tokens accepted by the API, each mapped to a user id.
    pub api_tokens: Vec<(SecretString, String)>,
    /// Duplicate suppression strategy for regeneration.
    pub dedup: DedupStrategy,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` to resolve variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("NUDGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let port = match lookup("NUDGE_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "NUDGE_PORT".to_string(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let log_dir = lookup("NUDGE_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let backend = match lookup("NUDGE_LLM_BACKEND").as_deref() {
            None | Some("anthropic") => LlmBackend::Anthropic,
            Some("openai") => LlmBackend::OpenAi,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "NUDGE_LLM_BACKEND".to_string(),
                    message: format!("unknown backend '{other}' (expected anthropic or openai)"),
                });
            }
        };

        let (key_var, default_model) = match backend {
            LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", DEFAULT_ANTHROPIC_MODEL),
            LlmBackend::OpenAi => ("OPENAI_API_KEY", DEFAULT_OPENAI_MODEL),
        };
        let api_key =
            lookup(key_var).ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;
        let model = lookup("NUDGE_MODEL").unwrap_or_else(|| default_model.to_string());

        let api_tokens = match lookup("NUDGE_API_TOKENS") {
            Some(raw) => parse_api_tokens(&raw)?,
            None => return Err(ConfigError::MissingEnvVar("NUDGE_API_TOKENS".to_string())),
        };

        let dedup = match lookup("NUDGE_DEDUP_STRATEGY") {
            Some(raw) => parse_dedup_strategy(&raw)?,
            None => DedupStrategy::default(),
        };

        Ok(Self {
            db_path,
            port,
            log_dir,
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            api_tokens,
            dedup,
        })
    }
}

/// Parse `token=user,token2=user2`.
fn parse_api_tokens(raw: &str) -> Result<Vec<(SecretString, String)>, ConfigError> {
    let mut tokens = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (token, user) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
            key: "NUDGE_API_TOKENS".to_string(),
            message: "entries must look like token=user_id".to_string(),
        })?;
        let (token, user) = (token.trim(), user.trim());
        if token.is_empty() || user.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "NUDGE_API_TOKENS".to_string(),
                message: "token and user id must both be non-empty".to_string(),
            });
        }
        tokens.push((SecretString::from(token.to_string()), user.to_string()));
    }
    if tokens.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "NUDGE_API_TOKENS".to_string(),
            message: "at least one token is required".to_string(),
        });
    }
    Ok(tokens)
}

/// Parse `substring` or `token_overlap[:threshold]`.
fn parse_dedup_strategy(raw: &str) -> Result<DedupStrategy, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "NUDGE_DEDUP_STRATEGY".to_string(),
        message,
    };

    let (name, arg) = match raw.trim().split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (raw.trim(), None),
    };

    match (name, arg) {
        ("substring", None) => Ok(DedupStrategy::Substring),
        ("token_overlap", None) => Ok(DedupStrategy::TokenOverlap { threshold: 0.6 }),
        ("token_overlap", Some(arg)) => {
            let threshold: f64 = arg
                .parse()
                .map_err(|e| invalid(format!("bad threshold '{arg}': {e}")))?;
            if !(threshold > 0.0 && threshold <= 1.0) {
                return Err(invalid(format!("threshold {threshold} must be in (0, 1]")));
            }
            Ok(DedupStrategy::TokenOverlap { threshold })
        }
        _ => Err(invalid(format!("unknown strategy '{raw}'"))),
    }
}
