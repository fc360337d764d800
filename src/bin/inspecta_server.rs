use std::sync::Arc;

use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use inspecta::api::{create_api_router, ApiState};
use inspecta::checklist::ChecklistRegistry;
use inspecta::database::DatabaseManager;
use inspecta::notify::{Notifier, NoopNotifier, WebhookNotifier};
use inspecta::render::HandlebarsRenderer;
use inspecta::storage::LocalBlobStore;
use inspecta::tasks::worker::{DocumentWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "inspecta=info,tower_http=debug".to_string()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Database connection and schema
    let db = DatabaseManager::with_default_config().await?;
    db.test_connection().await?;
    db.run_migrations().await?;
    let pool = db.pool().clone();

    // Checklist templates
    let checklist_dir =
        std::env::var("CHECKLIST_DIR").unwrap_or_else(|_| "checklists".to_string());
    let checklists = Arc::new(ChecklistRegistry::load_dir(&checklist_dir)?);
    info!(
        "Loaded {} checklist templates from {}",
        checklists.names().len(),
        checklist_dir
    );

    // Document generation pipeline
    let blob_dir = std::env::var("BLOB_STORE_DIR").unwrap_or_else(|_| "blobstore".to_string());
    let store = Arc::new(LocalBlobStore::new(&blob_dir));
    let renderer = Arc::new(HandlebarsRenderer::new()?);
    let notifier: Arc<dyn Notifier> = match std::env::var("NOTIFY_WEBHOOK_URL") {
        Ok(endpoint) => {
            info!("Notifications will be delivered to {}", endpoint);
            Arc::new(WebhookNotifier::new(endpoint))
        }
        Err(_) => {
            info!("NOTIFY_WEBHOOK_URL not set, notifications are logged only");
            Arc::new(NoopNotifier)
        }
    };
    let worker_config = WorkerConfig::from_env();
    let frontend_url = worker_config.frontend_url.clone();

    // Background worker with shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = DocumentWorker::new(pool.clone(), renderer, store, notifier, worker_config);
    let worker_handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await;
    });

    // HTTP surface
    let state = ApiState::new(pool, checklists, frontend_url);
    let app = create_api_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    );

    // Determine port
    let port = std::env::var("SERVER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or(8080);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    worker_handle.await?;
    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, stopping worker");
    let _ = shutdown_tx.send(true);
}
