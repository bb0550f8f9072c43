use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayKind,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: Option<GenerationConfig>,
}

/// Which sibling service this process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// `/embed` and `/health`
    #[default]
    Embedding,
    /// `/embed`, `/chat` and `/health`
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    /// Upper bound on queue wait plus inference for a single request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_name")]
    pub name: String,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_tokenizer_path")]
    pub tokenizer_path: String,
    #[serde(default)]
    pub device: Device,
    /// Inputs longer than this many tokens are truncated.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// L2-normalize pooled vectors, as sentence-transformers does for MiniLM.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
    #[serde(default = "default_embedding_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default)]
    pub do_sample: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Prefix each answer with the prompt, as text-generation pipelines do.
    #[serde(default = "default_return_full_text")]
    pub return_full_text: bool,
    #[serde(default = "default_generation_workers")]
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            name: default_embedding_name(),
            model_path: default_model_path(),
            tokenizer_path: default_tokenizer_path(),
            device: Device::default(),
            max_length: default_max_length(),
            normalize: default_normalize(),
            intra_threads: default_intra_threads(),
            workers: default_embedding_workers(),
        }
    }
}

impl GenerationConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: String::new(),
            model: default_generation_model(),
            system_prompt: None,
            max_new_tokens: default_max_new_tokens(),
            do_sample: false,
            temperature: default_temperature(),
            return_full_text: default_return_full_text(),
            workers: default_generation_workers(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5005
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_embedding_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_model_path() -> String {
    "models/all-MiniLM-L6-v2/model.onnx".to_string()
}

fn default_tokenizer_path() -> String {
    "models/all-MiniLM-L6-v2/tokenizer.json".to_string()
}

fn default_max_length() -> usize {
    256
}

fn default_normalize() -> bool {
    true
}

fn default_intra_threads() -> usize {
    4
}

fn default_embedding_workers() -> usize {
    1
}

fn default_generation_model() -> String {
    "google/gemma-3-1b-it".to_string()
}

fn default_max_new_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_return_full_text() -> bool {
    true
}

fn default_generation_workers() -> usize {
    4
}
