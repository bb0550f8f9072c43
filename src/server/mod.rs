pub mod handlers;

use crate::{
    Error, Result,
    config::{Config, GatewayKind},
    dispatch::ModelInvoker,
    models::{EmbeddingModel, OnnxEmbedder, OpenAiGenerator, TextGenerator},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use handlers::AppState;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Routes for the gateway. `/chat` is only mounted when a generation model is
/// loaded.
///
/// Request bodies are unbounded: any valid text is embedded, however long.
/// Unknown paths and wrong methods answer with a JSON error body.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route(
            "/embed",
            post(handlers::embed).fallback(handlers::method_not_allowed),
        )
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        );

    if state.invoker.has_generator() {
        app = app.route(
            "/chat",
            post(handlers::chat).fallback(handlers::method_not_allowed),
        );
    }

    app.fallback(handlers::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // Load models before binding so no request sees a half-initialized state
    let embedding_config = config.embedding.clone();
    let embedder: Arc<dyn EmbeddingModel> = Arc::new(
        tokio::task::spawn_blocking(move || OnnxEmbedder::load(&embedding_config))
            .await
            .map_err(|e| Error::model(format!("embedding model loader failed: {}", e)))??,
    );

    let generator: Option<Arc<dyn TextGenerator>> = match (config.gateway, &config.generation) {
        (GatewayKind::Chat, Some(generation)) => {
            info!(
                "Using generation model '{}' at {}",
                generation.model, generation.base_url
            );
            let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiGenerator::new(generation));
            Some(generator)
        }
        _ => None,
    };

    let invoker = ModelInvoker::from_config(&config, embedder, generator);
    let app = router(AppState::new(invoker));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting {:?} gateway on {}", config.gateway, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining in-flight requests");
}
