//! Flashcard Forge server
//!
//! Serves the REST API over sled storage and an OpenAI-compatible
//! completion service. Settings come from the environment (or `.env`):
//!
//!   OPENAI_API_KEY=sk-... JWT_SECRET=... cargo run --bin flashcards
//!   # then drive it with `cargo run --bin flashcards-cli -- --help`

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use flashcard_forge::auth::JwtAuthenticator;
use flashcard_forge::completion::OpenAiClient;
use flashcard_forge::config::Config;
use flashcard_forge::rest::{create_router, AppState};
use flashcard_forge::storage::Storage;
use flashcard_forge::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let _log_guard = telemetry::init(config.log_dir.as_deref());

    info!("Flashcard server starting...");
    info!("Storage: sled at {}", config.data_path);
    info!("Completion: {} via {}", config.openai_model, config.openai_base_url);

    let storage = Storage::open(&config.data_path)?;
    let completion = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.openai_model,
    );
    let tokens = JwtAuthenticator::new(config.jwt_secret.as_bytes(), config.jwt_ttl_secs);

    let app = create_router(AppState::new(
        storage.clone(),
        Arc::new(completion),
        tokens,
        config.max_tokens,
    ));

    let listener = TcpListener::bind(config.addr).await?;
    info!("REST API listening on {}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.flush()?;
    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
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
}
