/// Configuration module for ragfolio.
///
/// Handles loading, validating, and providing default configuration values
/// for chunking, retrieval, the embedding model, and the Ollama backend.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_db_path() -> String {
    "./knowledge.db".to_string()
}

fn default_max_tokens() -> usize {
    800
}

fn default_overlap_tokens() -> usize {
    150
}

fn default_min_chunk_size() -> usize {
    100
}

fn default_top_k() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.5
}

fn default_context_max_tokens() -> usize {
    2000
}

fn default_model_name() -> String {
    "multilingual-e5-base".to_string()
}

fn default_dimensions() -> usize {
    768
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "mistral:7b-instruct-q4_0".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    120
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Token budgets for the text segmenter.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,

    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

/// Retrieval defaults. Tunable per deployment; per-query overrides go
/// through the orchestrator API.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_context_max_tokens")]
    pub context_max_tokens: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            model: ModelConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            context_max_tokens: default_context_max_tokens(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            dimensions: default_dimensions(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.chunking.max_tokens > 0,
            "chunking.max_tokens must be positive"
        );
        anyhow::ensure!(
            self.chunking.overlap_tokens < self.chunking.max_tokens,
            "chunking.overlap_tokens must be smaller than max_tokens"
        );
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        anyhow::ensure!(
            (-1.0..=1.0).contains(&self.retrieval.similarity_threshold),
            "retrieval.similarity_threshold must be within [-1, 1]"
        );
        anyhow::ensure!(
            self.retrieval.context_max_tokens > 0,
            "retrieval.context_max_tokens must be positive"
        );
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        anyhow::ensure!(!self.ollama.host.is_empty(), "ollama.host must be set");
        anyhow::ensure!(self.ollama.timeout_secs > 0, "ollama.timeout_secs must be positive");
        Ok(())
    }

    /// Directory holding the ONNX model and tokenizer files.
    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        PathBuf::from("models").join(&self.model.name)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
