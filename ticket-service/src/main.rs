use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use diesel::PgConnection;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use diesel::Connection;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ticket_service::api::{self, AppState};
use ticket_service::config::{self, Config};
use ticket_service::queue::IntakeQueue;
use ticket_service::store::PgTicketStore;
use ticket_service::worker::FulfillmentStage;

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = config::load_env_file();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match env_file {
        Some(path) => info!("Loaded environment from {}", path),
        None => warn!("No .env file found, using process environment only"),
    }

    let config = Config::parse();

    // Run migrations first
    info!("Running database migrations...");
    let mut conn = PgConnection::establish(&config.database_url)?;
    conn.run_pending_migrations(MIGRATIONS).map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
    drop(conn);
    info!("Migrations completed successfully");

    let manager = diesel_async::pooled_connection::AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder().max_size(config.db_pool_size).build(manager).await?;
    let store = PgTicketStore::new(pool);

    let (queue, receiver) = IntakeQueue::bounded(config.queue_capacity)?;
    let stage = FulfillmentStage::new(store.clone(), config.processing_delay());

    let worker = tokio::spawn(async move {
        stage.run(receiver).await;
    });

    let app = api::create_router(AppState {
        queue,
        store: Arc::new(store),
    });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!(
        "Ticket service listening on port {} (queue capacity {}, processing delay {:?})",
        config.port,
        config.queue_capacity,
        config.processing_delay()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router and every queue handle it held are gone now, so the stage
    // sees the queue close once the backlog is processed.
    info!("HTTP server stopped, draining admitted requests...");
    match tokio::time::timeout(config.shutdown_timeout(), worker).await {
        Ok(Ok(())) => info!("All admitted requests processed, goodbye"),
        Ok(Err(e)) => error!("Fulfillment stage panicked: {}", e),
        Err(_) => warn!(
            "Shutdown timeout of {:?} reached with requests still queued",
            config.shutdown_timeout()
        ),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
