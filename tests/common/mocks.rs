use async_trait::async_trait;
use inference_gateway::{
    Error, Result,
    models::{EmbeddingModel, Generation, GenerationParams, TextGenerator},
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Deterministic stand-in for an embedding model: each dimension is derived
/// from a hash of the text, so equal inputs give equal vectors.
#[derive(Debug)]
pub struct MockEmbedder {
    pub dimension: usize,
    pub calls: Arc<AtomicUsize>,
    pub fail_on: Option<String>,
    pub panic_on: Option<String>,
    pub sleep_on: Option<(String, Duration)>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
            panic_on: None,
            sleep_on: None,
        }
    }

    /// Fail with an inference error whenever the input equals `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Panic whenever the input equals `text`.
    pub fn panicking_on(mut self, text: &str) -> Self {
        self.panic_on = Some(text.to_string());
        self
    }

    /// Block the calling thread for `delay` whenever the input equals `text`.
    pub fn sleeping_on(mut self, text: &str, delay: Duration) -> Self {
        self.sleep_on = Some((text.to_string(), delay));
        self
    }
}

impl EmbeddingModel for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((slow, delay)) = &self.sleep_on
            && slow == text
        {
            std::thread::sleep(*delay);
        }
        if self.panic_on.as_deref() == Some(text) {
            panic!("mock embedder panicked on '{}'", text);
        }
        if self.fail_on.as_deref() == Some(text) {
            return Err(Error::inference("input produced an invalid tensor"));
        }

        Ok((0..self.dimension)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                i.hash(&mut hasher);
                (hasher.finish() % 10_000) as f32 / 10_000.0
            })
            .collect())
    }
}

/// Mock generation model for testing
#[derive(Debug)]
pub struct MockGenerator {
    pub answer: String,
    pub error: Option<String>,
    pub delay: Option<Duration>,
    pub requests: Arc<Mutex<Vec<(String, GenerationParams)>>>,
}

impl MockGenerator {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            error: None,
            delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_requests(&self) -> Vec<(String, GenerationParams)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Vec<Generation>> {
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), params.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(ref error) = self.error {
            return Err(Error::inference(error.clone()));
        }

        Ok(vec![Generation {
            generated_text: self.answer.clone(),
        }])
    }
}
