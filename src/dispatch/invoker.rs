use super::{DispatchError, InferencePool};
use crate::{
    config::Config,
    models::{EmbeddingModel, Generation, GenerationParams, TextGenerator},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error};

struct ChatModel {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
    pool: InferencePool,
}

/// Calls the pre-loaded models on behalf of validated requests.
///
/// Every failure (model error, worker panic, deadline) comes back as
/// `DispatchError::Inference`.
pub struct ModelInvoker {
    embedder: Arc<dyn EmbeddingModel>,
    embed_pool: InferencePool,
    chat: Option<ChatModel>,
}

impl ModelInvoker {
    pub fn new(embedder: Arc<dyn EmbeddingModel>, workers: usize, timeout: Duration) -> Self {
        Self {
            embedder,
            embed_pool: InferencePool::new("embedding", workers, timeout),
            chat: None,
        }
    }

    pub fn with_generator(
        mut self,
        generator: Arc<dyn TextGenerator>,
        params: GenerationParams,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        self.chat = Some(ChatModel {
            generator,
            params,
            pool: InferencePool::new("generation", workers, timeout),
        });
        self
    }

    /// Wires the models according to the config's worker counts, timeout and
    /// generation parameters.
    pub fn from_config(
        config: &Config,
        embedder: Arc<dyn EmbeddingModel>,
        generator: Option<Arc<dyn TextGenerator>>,
    ) -> Self {
        let timeout = Duration::from_secs(config.server.request_timeout_secs);
        let invoker = Self::new(embedder, config.embedding.workers, timeout);

        match (generator, config.generation.as_ref()) {
            (Some(generator), Some(generation)) => invoker.with_generator(
                generator,
                GenerationParams::from(generation),
                generation.workers,
                timeout,
            ),
            _ => invoker,
        }
    }

    pub fn has_generator(&self) -> bool {
        self.chat.is_some()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.name()
    }

    pub async fn embed(&self, text: String) -> Result<Vec<f32>, DispatchError> {
        let model = Arc::clone(&self.embedder);
        let expected = model.dimension();

        let vector = self
            .embed_pool
            .run_blocking(move || model.encode(&text))
            .await
            .map_err(|e| {
                error!("Embedding inference failed: {}", e);
                DispatchError::inference(e.to_string())
            })?;

        check_vector(&vector, expected)?;
        debug!("Produced {}-dimensional embedding", vector.len());

        Ok(vector)
    }

    pub async fn chat(&self, prompt: String) -> Result<Vec<Generation>, DispatchError> {
        let chat = self
            .chat
            .as_ref()
            .ok_or_else(|| DispatchError::inference("no generation model is loaded"))?;

        chat.pool
            .run(chat.generator.generate(&prompt, &chat.params))
            .await
            .map_err(|e| {
                error!("Generation with '{}' failed: {}", chat.generator.name(), e);
                DispatchError::inference(e.to_string())
            })
    }
}

/// The vector must match the probed dimension and be representable as JSON
/// numbers.
fn check_vector(vector: &[f32], expected: usize) -> Result<(), DispatchError> {
    if vector.len() != expected {
        return Err(DispatchError::inference(format!(
            "embedding model returned {} dimensions, expected {}",
            vector.len(),
            expected
        )));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(DispatchError::inference(
            "embedding model returned a non-finite value",
        ));
    }
    Ok(())
}
