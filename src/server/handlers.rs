use crate::dispatch::{
    self, ChatResponse, DispatchError, EmbedResponse, ErrorResponse, HealthResponse, ModelInvoker,
};
use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Shared by every request; built once before the listener is bound.
#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<ModelInvoker>,
}

impl AppState {
    pub fn new(invoker: ModelInvoker) -> Self {
        Self {
            invoker: Arc::new(invoker),
        }
    }
}

#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn embed(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmbedResponse>, DispatchError> {
    let body = read_body(body)?;
    let payload = dispatch::embed_payload(&body).inspect_err(|e| {
        warn!("Rejected embed request: {}", e);
    })?;

    info!(
        "Embedding {} bytes of text with '{}'",
        payload.text.len(),
        state.invoker.embedding_model()
    );

    let embedding = state.invoker.embed(payload.text).await?;
    Ok(Json(EmbedResponse { embedding }))
}

#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatResponse>, DispatchError> {
    let body = read_body(body)?;
    let payload = dispatch::chat_payload(&body).inspect_err(|e| {
        warn!("Rejected chat request: {}", e);
    })?;

    info!("Generating answer for {} byte prompt", payload.prompt.len());

    let answer = state.invoker.chat(payload.prompt).await?;
    Ok(Json(ChatResponse { answer }))
}

/// Liveness only; never touches the models.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    error_body(StatusCode::NOT_FOUND, "Not found")
}

pub async fn method_not_allowed() -> (StatusCode, Json<ErrorResponse>) {
    error_body(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn error_body(status: StatusCode, error: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// A body that could not be read is reported like any other bad request.
fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, DispatchError> {
    body.map_err(|rejection| {
        warn!("Failed to read request body: {}", rejection.body_text());
        DispatchError::Validation(rejection.body_text())
    })
}
