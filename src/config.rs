//! NeuroGraph configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main NeuroGraph configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NeuroGraphConfig {
    /// HTTP API configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote semantic service configuration
    #[serde(default)]
    pub models: ModelsConfig,

    /// Ingestion pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Live voice bridge configuration
    #[serde(default)]
    pub live: LiveConfig,
}

impl NeuroGraphConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load from an explicit path, else from the default location if it
    /// exists, else fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Default configuration file location (~/.neurograph/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".neurograph").join("config.toml"))
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18810,
            cors_origins: Vec::new(),
        }
    }
}

/// Remote semantic service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// REST base URL of the generative language API
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Model used for graph extraction and transcription
    pub fast_model: String,

    /// Model used for the deep response pass and video analysis
    pub thinking_model: String,

    /// Model used by the live voice bridge
    pub live_model: String,

    /// Thinking token budget for the deep response pass
    pub thinking_budget: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            fast_model: "gemini-2.5-flash".to_string(),
            thinking_model: "gemini-3-pro-preview".to_string(),
            live_model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            thinking_budget: 1024,
            timeout_secs: 60,
        }
    }
}

impl ModelsConfig {
    /// Resolve the API key from the environment.
    ///
    /// Tries the configured name first, then its UPPER_CASE form.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var(self.api_key_env.to_uppercase()))
            .ok()
            .filter(|k| !k.is_empty())
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Anchor X coordinate new nodes are placed around
    pub anchor_x: f64,

    /// Anchor Y coordinate new nodes are placed around
    pub anchor_y: f64,

    /// Maximum placement distance from the anchor
    pub max_radius: f64,

    /// Capacity of the engine event broadcast channel
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anchor_x: 0.0,
            anchor_y: 0.0,
            max_radius: 300.0,
            event_capacity: 256,
        }
    }
}

/// Sample encoding of the live audio input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// Signed 16-bit little-endian
    #[default]
    S16le,
    /// 32-bit float little-endian in [-1.0, 1.0]
    F32le,
}

/// Live voice bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Bidirectional streaming endpoint
    pub endpoint: String,

    /// Prebuilt voice name
    pub voice_name: String,

    /// Samples per outbound audio frame
    pub frame_samples: usize,

    /// Input sample rate in Hz
    pub sample_rate: u32,

    /// Encoding of the raw input stream
    #[serde(default)]
    pub input_format: SampleFormat,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string(),
            voice_name: "Kore".to_string(),
            frame_samples: 4096,
            sample_rate: 16000,
            input_format: SampleFormat::S16le,
        }
    }
}
