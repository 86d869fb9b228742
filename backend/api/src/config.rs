use std::time::Duration;

use embeddings::DEFAULT_MODEL_ID;
use semchunk_core::EmbeddingConfig;

/// HTTP server settings, loaded from environment variables with defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_u16("PORT", 8080),
            read_timeout: Duration::from_secs(env_u64("READ_TIMEOUT_SECONDS", 120)),
            write_timeout: Duration::from_secs(env_u64("WRITE_TIMEOUT_SECONDS", 120)),
        }
    }

    /// Total wall-clock budget for one request. Hyper exposes no split
    /// read/write deadlines at this layer, so both env knobs fold into a
    /// single per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.read_timeout + self.write_timeout
    }
}

pub fn embedding_config_from_env() -> EmbeddingConfig {
    EmbeddingConfig {
        max_batch_tokens: env_usize("MAX_BATCH_TOKENS", 6000),
    }
}

pub fn model_id_from_env() -> String {
    std::env::var("EMBEDDING_MODEL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string())
}

// Invalid or non-positive values fall back to the default.

fn env_u16(name: &str, default: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
