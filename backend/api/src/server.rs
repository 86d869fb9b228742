use anyhow::{Context, Result};
use axum::{routing::get, routing::post, Router};
use embeddings::EmbeddingModel;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::config::{embedding_config_from_env, model_id_from_env, ServerConfig};
use crate::handlers::{embed_documents, get_status, AppState};

pub async fn start_server() -> Result<()> {
    setup_tracing();

    let server_config = ServerConfig::from_env();
    let embedding_config = embedding_config_from_env();
    let model_id = model_id_from_env();
    info!(
        "Server config: port={}, read_timeout={:?}, write_timeout={:?}",
        server_config.port, server_config.read_timeout, server_config.write_timeout
    );
    info!(
        "Embedding config: max_batch_tokens={}",
        embedding_config.max_batch_tokens
    );

    let model = Arc::new(
        EmbeddingModel::load(&model_id)
            .with_context(|| format!("failed to load embedding model {model_id}"))?,
    );

    let app_state = Arc::new(AppState {
        model,
        model_id,
        embedding_config,
    });

    let app = Router::new()
        .route("/embed", post(embed_documents))
        .route("/status", get(get_status))
        .route("/", get(root))
        .layer(TimeoutLayer::new(server_config.request_timeout()))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn root() -> &'static str {
    "semantic chunking service is running"
}

fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
