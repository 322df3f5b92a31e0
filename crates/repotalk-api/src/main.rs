use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use repotalk_api::{bootstrap, build_router, config::Config, state::AppState, telemetry};
use repotalk_assistant::{AssistantService, OpenAIAssistantClient, RunPoller};
use repotalk_ingest::GitFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    telemetry::init(&config.logging)?;

    tracing::info!("Starting repotalk API server");
    tracing::info!("Config loaded: {}", config.bind_addr());

    let client = OpenAIAssistantClient::new(config.client_config())
        .context("Failed to initialize assistant client")?;
    let assistants = AssistantService::new(Arc::new(client), RunPoller::from(&config.poll));

    let assistant_id = bootstrap::init_assistant(&config, &assistants).await?;
    tracing::info!(assistant = %assistant_id, "Assistant ready");

    let addr = config.bind_addr();
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(
        config,
        assistants,
        assistant_id,
        Arc::new(GitFetcher::default()),
        shutdown.clone(),
    ));

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Could not bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels in-flight polls
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown requested");
    shutdown.cancel();
}
