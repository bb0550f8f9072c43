//! Request-to-model dispatch: validate the body, invoke a loaded model,
//! encode the outcome.

mod encode;
mod invoker;
mod pool;
mod validate;

pub use encode::{ChatResponse, EmbedResponse, ErrorResponse, HealthResponse};
pub use invoker::ModelInvoker;
pub use pool::InferencePool;
pub use validate::{ChatPayload, EmbedPayload, chat_payload, embed_payload, required_string};

use axum::http::StatusCode;
use thiserror::Error;

const FALLBACK_INFERENCE_MESSAGE: &str = "inference failed";

/// Failure of a single request, carrying the message shown to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Inference(String),
}

impl DispatchError {
    pub fn missing(field: &str) -> Self {
        Self::Validation(format!("Missing '{}' in request", field))
    }

    pub fn not_a_string(field: &str) -> Self {
        Self::Validation(format!("'{}' must be a string", field))
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.trim().is_empty() {
            Self::Inference(FALLBACK_INFERENCE_MESSAGE.to_string())
        } else {
            Self::Inference(msg)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
