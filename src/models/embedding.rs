use crate::{
    Error, Result,
    config::{Device, EmbeddingConfig},
};
use ndarray::{Array1, Array2, ArrayView2, Axis, Ix2};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

const PROBE_TEXT: &str = "dimension probe";

/// A loaded embedding model. `encode` blocks the calling thread, so callers
/// run it on the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait EmbeddingModel: Send + Sync {
    fn name(&self) -> &str;

    /// Length of every vector `encode` returns.
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// Sentence-transformer (all-MiniLM-L6-v2 by default) exported to ONNX.
///
/// Token embeddings are mean-pooled over the attention mask and optionally
/// L2-normalized. `Session::run` needs exclusive access, so concurrent callers
/// are serialized on the session mutex.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    name: String,
    dimension: usize,
    normalize: bool,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .field("normalize", &self.normalize)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let model_path = Path::new(&config.model_path);
        let tokenizer_path = Path::new(&config.tokenizer_path);

        if !model_path.exists() {
            return Err(Error::model(format!(
                "ONNX model file not found: {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(Error::model(format!(
                "Tokenizer file not found: {}",
                tokenizer_path.display()
            )));
        }

        info!(
            "Loading embedding model '{}' from {} on {:?}",
            config.name,
            model_path.display(),
            config.device
        );

        let session = build_session(model_path, config.device, config.intra_threads)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| Error::model(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| Error::model(format!("Failed to configure truncation: {}", e)))?;
        tokenizer.with_padding(None);

        let mut embedder = Self {
            session: Mutex::new(session),
            tokenizer,
            name: config.name.clone(),
            dimension: 0,
            normalize: config.normalize,
        };

        // Output width depends on the exported graph, so measure it once.
        let probe = embedder.run(PROBE_TEXT)?;
        if probe.is_empty() {
            return Err(Error::model("embedding model produced an empty vector"));
        }
        embedder.dimension = probe.len();

        info!(
            "Embedding model '{}' ready ({} dimensions)",
            embedder.name, embedder.dimension
        );

        Ok(embedder)
    }

    fn run(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::tokenizer(e.to_string()))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();
        let seq_len = input_ids.len();

        debug!("Encoding {} tokens with '{}'", seq_len, self.name);

        let input_ids = tensor(Array2::from_shape_vec((1, seq_len), input_ids)?)?;
        let mask_tensor = tensor(Array2::from_shape_vec((1, seq_len), attention_mask.clone())?)?;
        let token_type_ids = tensor(Array2::from_shape_vec((1, seq_len), token_type_ids)?)?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => mask_tensor,
                "token_type_ids" => token_type_ids
            ])
            .map_err(|e| Error::inference(e.to_string()))?;

        // [batch, seq_len, hidden]
        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| Error::inference(format!("Failed to extract output tensor: {}", e)))?;
        if hidden.ndim() != 3 {
            return Err(Error::inference(format!(
                "unexpected output shape {:?}, expected [batch, seq_len, hidden]",
                hidden.shape()
            )));
        }
        let tokens = hidden.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let mut pooled = mean_pool(tokens, &attention_mask);
        if self.normalize {
            l2_normalize(&mut pooled);
        }

        Ok(pooled.to_vec())
    }
}

impl EmbeddingModel for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.run(text)
    }
}

fn build_session(model_path: &Path, device: Device, intra_threads: usize) -> Result<Session> {
    let providers = match device {
        // Needs the `cuda` feature; registration failures fall through to CPU.
        Device::Cuda => vec![
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
    };

    Session::builder()
        .map_err(|e| Error::model(format!("Failed to create session builder: {}", e)))?
        .with_execution_providers(providers)
        .map_err(|e| Error::model(format!("Failed to set execution providers: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::model(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(intra_threads)
        .map_err(|e| Error::model(format!("Failed to set intra threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| {
            Error::model(format!(
                "Failed to load ONNX model from {}: {}",
                model_path.display(),
                e
            ))
        })
}

fn tensor(array: Array2<i64>) -> Result<Tensor<i64>> {
    Tensor::from_array(array).map_err(|e| Error::inference(format!("Failed to build tensor: {}", e)))
}

/// Averages the token rows whose mask entry is non-zero.
pub(crate) fn mean_pool(tokens: ArrayView2<'_, f32>, mask: &[i64]) -> Array1<f32> {
    let mut pooled = Array1::<f32>::zeros(tokens.ncols());
    let mut count = 0.0f32;

    for (row, &m) in tokens.outer_iter().zip(mask) {
        if m != 0 {
            pooled += &row;
            count += 1.0;
        }
    }

    pooled /= count.max(1e-9);
    pooled
}

pub(crate) fn l2_normalize(vector: &mut Array1<f32>) {
    let norm = vector.dot(&*vector).sqrt();
    if norm > 0.0 {
        *vector /= norm;
    }
}
