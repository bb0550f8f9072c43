mod embedding;
mod generation;

pub use embedding::{EmbeddingModel, OnnxEmbedder};
pub use generation::{Generation, GenerationParams, OpenAiGenerator, Sampling, TextGenerator};

#[cfg(test)]
pub use embedding::MockEmbeddingModel;
