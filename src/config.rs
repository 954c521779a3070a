//! TOML configuration with environment overrides.
//!
//! All settings have documented defaults, so the server runs with no config
//! file at all. A TOML file (see `config/docq.example.toml`) can override any
//! section, and a small set of environment variables override the file:
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `OLLAMA_HOST` | backend endpoint | `http://localhost:11434` |
//! | `OLLAMA_CHAT_MODEL` | chat model id | `llama3.2:1b` |
//! | `OLLAMA_EMBEDDING_MODEL` | embedding model id | `nomic-embed-text:137m-v1.5-fp16` |
//! | `DOCQ_CHUNK_TOKENS` | chunk size (tokens) | `1000` |
//! | `DOCQ_CHUNK_OVERLAP` | chunk overlap (tokens) | `200` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address for the HTTP server.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Minimum interval between streamed answer fragments, in milliseconds.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            pace_ms: default_pace_ms(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_pace_ms() -> u64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama instance.
    #[serde(default = "default_host")]
    pub host: String,
    /// Model used for chat completion.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Request timeout. Generation on CPU-only hosts can be very slow.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry budget for the embedding endpoint (429/5xx/network only).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}
fn default_chat_model() -> String {
    "llama3.2:1b".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text:137m-v1.5-fp16".to_string()
}
fn default_timeout_secs() -> u64 {
    3600
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in tokens (approximated as 4 chars per token).
    #[serde(default = "default_chunk_tokens")]
    pub chunk_tokens: usize,
    /// Overlap carried from one chunk into the next, in tokens.
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: default_chunk_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_chunk_tokens() -> usize {
    1000
}
fn default_overlap_tokens() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved as context for each question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    4
}

/// Load configuration: defaults, then the TOML file if given, then env vars.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {}", p.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(host) = std::env::var("OLLAMA_HOST") {
        config.ollama.host = host;
    }
    if let Ok(model) = std::env::var("OLLAMA_CHAT_MODEL") {
        config.ollama.chat_model = model;
    }
    if let Ok(model) = std::env::var("OLLAMA_EMBEDDING_MODEL") {
        config.ollama.embedding_model = model;
    }
    if let Ok(v) = std::env::var("DOCQ_CHUNK_TOKENS") {
        config.chunking.chunk_tokens = v
            .parse()
            .with_context(|| format!("DOCQ_CHUNK_TOKENS is not a number: {}", v))?;
    }
    if let Ok(v) = std::env::var("DOCQ_CHUNK_OVERLAP") {
        config.chunking.overlap_tokens = v
            .parse()
            .with_context(|| format!("DOCQ_CHUNK_OVERLAP is not a number: {}", v))?;
    }
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_tokens == 0 {
        anyhow::bail!("chunking.chunk_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.chunk_tokens {
        anyhow::bail!("chunking.overlap_tokens must be smaller than chunk_tokens");
    }
    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.ollama.host.trim().is_empty() {
        anyhow::bail!("ollama.host must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.server.pace_ms, 50);
        assert_eq!(config.ollama.chat_model, "llama3.2:1b");
        assert_eq!(config.chunking.chunk_tokens, 1000);
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [ollama]
            chat_model = "mistral:7b"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.pace_ms, 50);
        assert_eq!(config.ollama.chat_model, "mistral:7b");
        assert_eq!(config.ollama.host, "http://localhost:11434");
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_tokens = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_overlap_at_least_chunk_size() {
        let mut config = Config::default();
        config.chunking.chunk_tokens = 100;
        config.chunking.overlap_tokens = 100;
        assert!(validate(&config).is_err());
    }
}
