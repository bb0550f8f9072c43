use super::mocks::{MockEmbedder, MockGenerator};
use axum::Router;
use inference_gateway::{
    Result,
    config::{Config, GatewayKind, GenerationConfig},
    dispatch::ModelInvoker,
    models::{EmbeddingModel, TextGenerator},
    server::{self, handlers::AppState},
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::fs;

pub const TEST_DIMENSION: usize = 384;

/// Create a test configuration with sensible defaults
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 8080;
    config.server.request_timeout_secs = 5;
    config.server.logs.level = "debug".to_string();
    config
}

/// Create a chat gateway configuration pointing at `base_url`
pub fn create_chat_config(base_url: &str) -> Config {
    let mut config = create_test_config();
    config.gateway = GatewayKind::Chat;
    config.generation = Some(GenerationConfig::new(base_url));
    config
}

/// Embedding gateway backed by `embedder`
pub fn embedding_app(embedder: MockEmbedder) -> Router {
    embedding_app_with(embedder, &create_test_config())
}

pub fn embedding_app_with(embedder: MockEmbedder, config: &Config) -> Router {
    let embedder: Arc<dyn EmbeddingModel> = Arc::new(embedder);
    let invoker = ModelInvoker::from_config(config, embedder, None);
    server::router(AppState::new(invoker))
}

/// Chat gateway backed by the given models
pub fn chat_app(
    embedder: MockEmbedder,
    generator: Arc<dyn TextGenerator>,
    config: &Config,
) -> Router {
    let embedder: Arc<dyn EmbeddingModel> = Arc::new(embedder);
    let invoker = ModelInvoker::from_config(config, embedder, Some(generator));
    server::router(AppState::new(invoker))
}

pub fn mock_chat_app(generator: Arc<MockGenerator>) -> Router {
    let config = create_chat_config("http://unused.invalid/v1");
    chat_app(MockEmbedder::new(TEST_DIMENSION), generator, &config)
}

/// Create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test config YAML file
pub async fn create_test_config_file(dir: &TempDir, content: &str) -> Result<String> {
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, content).await?;
    Ok(config_path.to_string_lossy().to_string())
}

/// Sample configuration YAML for testing
pub const SAMPLE_CONFIG_YAML: &str = r#"
gateway: chat
server:
  host: "127.0.0.1"
  port: 5005
  request_timeout_secs: 30
  logs:
    level: "debug"
embedding:
  name: "all-MiniLM-L6-v2"
  model_path: "/models/minilm/model.onnx"
  tokenizer_path: "/models/minilm/tokenizer.json"
  device: cpu
  workers: 2
generation:
  base_url: "http://localhost:8000/v1"
  model: "google/gemma-3-1b-it"
  system_prompt: "You are a helpful assistant."
  max_new_tokens: 256
  do_sample: true
  temperature: 0.5
"#;
