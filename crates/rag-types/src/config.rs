//! Configuration loading for the RAG store.
//!
//! Layered precedence: built-in defaults -> config file
//! (~/.config/rag-store/config.toml) -> CLI-specified file -> RAG_*
//! environment variables. CLI flags are applied by the caller.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::RagError;

/// Embedding gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// API base URL (OpenAI-compatible embeddings endpoint)
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Model name (e.g., "text-embedding-3-small")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            api_key: None,
        }
    }
}

/// Answer generator settings.
///
/// A missing API key is not an error: the query pipeline degrades to
/// returning the retrieved contexts verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// API base URL (OpenAI-compatible chat completions endpoint)
    #[serde(default = "default_generator_base_url")]
    pub base_url: String,

    /// Model name (e.g., "gpt-4o-mini")
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_generator_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generator_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: default_generator_base_url(),
            model: default_generator_model(),
            api_key: None,
        }
    }
}

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Data directory holding the index, metadata, and upload copies
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Target chunk size in characters (splitter input)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of results retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum accepted upload size in megabytes
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: usize,

    /// Accepted file extensions for ingestion
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Embedding gateway configuration
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Generator gateway configuration
    #[serde(default)]
    pub generator: GeneratorSettings,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", "rag-store")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    80
}

fn default_top_k() -> usize {
    5
}

fn default_max_file_size_mb() -> usize {
    20
}

fn default_allowed_extensions() -> Vec<String> {
    vec![".txt".to_string(), ".md".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            max_file_size_mb: default_max_file_size_mb(),
            allowed_extensions: default_allowed_extensions(),
            embedding: EmbeddingSettings::default(),
            generator: GeneratorSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/rag-store/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (RAG_*)
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, RagError> {
        let config_dir = ProjectDirs::from("", "", "rag-store")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data_dir", default_data_dir())
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("chunk_size", default_chunk_size() as i64)
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("chunk_overlap", default_chunk_overlap() as i64)
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("top_k", default_top_k() as i64)
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("max_file_size_mb", default_max_file_size_mb() as i64)
            .map_err(|e| RagError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| RagError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: RAG__DATA_DIR, RAG__TOP_K, RAG__EMBEDDING__MODEL, etc.
        builder = builder.add_source(
            Environment::with_prefix("RAG")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| RagError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| RagError::Config(e.to_string()))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be > 0".to_string()));
        }
        Ok(())
    }

    /// Path of the binary vector index file.
    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("vectors.idx")
    }

    /// Path of the JSON chunk metadata file.
    pub fn metadata_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("chunks.json")
    }

    /// Directory where copies of ingested uploads are kept.
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("uploads")
    }

    /// Maximum accepted upload size in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Create the data and upload directories if missing.
    pub fn ensure_directories(&self) -> Result<(), RagError> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.upload_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.chunk_size, 800);
        assert_eq!(settings.chunk_overlap, 80);
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.max_file_size_mb, 20);
        assert_eq!(settings.embedding.model, "text-embedding-3-small");
        assert_eq!(settings.generator.model, "gpt-4o-mini");
    }

    #[test]
    fn test_paths_derive_from_data_dir() {
        let settings = Settings {
            data_dir: "/tmp/rag-test".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.index_path(), PathBuf::from("/tmp/rag-test/vectors.idx"));
        assert_eq!(settings.metadata_path(), PathBuf::from("/tmp/rag-test/chunks.json"));
        assert_eq!(settings.upload_dir(), PathBuf::from("/tmp/rag-test/uploads"));
    }

    #[test]
    fn test_validate_rejects_bad_overlap() {
        let settings = Settings {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let settings = Settings {
            top_k: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_max_file_size_bytes() {
        let settings = Settings {
            max_file_size_mb: 2,
            ..Settings::default()
        };
        assert_eq!(settings.max_file_size_bytes(), 2 * 1024 * 1024);
    }
}
