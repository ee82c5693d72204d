// src/config.rs

use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Credentials for the optional text-completion service.
/// Absent when either the URL or the key is not configured.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. When unset the service runs on in-memory storage.
    pub database_url: Option<String>,
    pub rust_log: String,
    pub bind_addr: SocketAddr,

    /// Lifetime of an issued quiz batch.
    pub session_ttl_secs: u64,
    /// Number of items per issued batch (capped at `MAX_QUESTION_COUNT`).
    pub question_count: usize,

    pub question_bank_path: PathBuf,
    pub level_model_path: PathBuf,
    pub course_catalog_path: PathBuf,

    /// How many recent placement records the difficulty advisor reads.
    pub history_window: usize,
    /// Score bands on the 5-point scale used by the difficulty advisor.
    pub advanced_band: f64,
    pub intermediate_band: f64,

    pub recommended_course_limit: usize,

    pub completion: Option<CompletionConfig>,
    pub completion_timeout_ms: u64,
}

pub const MAX_QUESTION_COUNT: usize = 15;

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            rust_log: "info".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            session_ttl_secs: 30 * 60,
            question_count: 10,
            question_bank_path: PathBuf::from("data/question_bank.json"),
            level_model_path: PathBuf::from("data/level_pipeline.json"),
            course_catalog_path: PathBuf::from("data/courses.json"),
            history_window: 5,
            advanced_band: 4.5,
            intermediate_band: 3.0,
            recommended_course_limit: 5,
            completion: None,
            completion_timeout_ms: 8_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let completion = match (env::var("COMPLETION_API_URL"), env::var("COMPLETION_API_KEY")) {
            (Ok(api_url), Ok(api_key)) if !api_url.is_empty() && !api_key.is_empty() => {
                Some(CompletionConfig {
                    api_url,
                    api_key,
                    model: env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                })
            }
            _ => None,
        };

        Self {
            database_url,
            rust_log,
            bind_addr: parse_or("BIND_ADDR", defaults.bind_addr),
            session_ttl_secs: parse_or("QUIZ_SESSION_TTL_SECS", defaults.session_ttl_secs),
            question_count: parse_or("QUIZ_QUESTION_COUNT", defaults.question_count)
                .clamp(1, MAX_QUESTION_COUNT),
            question_bank_path: parse_or("QUESTION_BANK_PATH", defaults.question_bank_path),
            level_model_path: parse_or("LEVEL_MODEL_PATH", defaults.level_model_path),
            course_catalog_path: parse_or("COURSE_CATALOG_PATH", defaults.course_catalog_path),
            history_window: parse_or("HISTORY_WINDOW", defaults.history_window),
            advanced_band: parse_or("ADVANCED_BAND", defaults.advanced_band),
            intermediate_band: parse_or("INTERMEDIATE_BAND", defaults.intermediate_band),
            recommended_course_limit: parse_or(
                "RECOMMENDED_COURSE_LIMIT",
                defaults.recommended_course_limit,
            ),
            completion,
            completion_timeout_ms: parse_or("COMPLETION_TIMEOUT_MS", defaults.completion_timeout_ms),
        }
    }
}

/// Reads and parses an environment variable, keeping the default when it is
/// missing or malformed.
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring malformed {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
