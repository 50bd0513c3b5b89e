use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rental_chat::adapters::postgres::{
    self, PostgresChatReader, PostgresChatStore, PostgresMarketplaceDirectory,
};
use rental_chat::adapters::RedisUnreadCounter;
use rental_chat::app::{build_router, ChatBackends, Delivery};
use rental_chat::application::AfterCommitRunner;
use rental_chat::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config);

    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::MIGRATOR.run(&pool).await?;
        tracing::info!("database migrations applied");
    }
    let counter = RedisUnreadCounter::open(&config.redis)?;
    if let Err(error) = counter.connect().await {
        tracing::warn!(%error, "redis unreachable; unread counts read as 0 until it connects");
    }
    let directory = Arc::new(PostgresMarketplaceDirectory::new(pool.clone()));

    let backends = ChatBackends {
        store: Arc::new(PostgresChatStore::new(pool.clone())),
        reader: Arc::new(PostgresChatReader::new(pool.clone())),
        listings: directory.clone(),
        members: directory,
        counter: Arc::new(counter),
    };

    let (runner, worker) = AfterCommitRunner::spawn();
    let delivery = Delivery::new(runner, &config.chat);
    let app = build_router(backends, &delivery, &config.server, &config.chat);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "rental-chat listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let committed effects finish, then stop the runner.
    delivery.runner.shutdown().await;
    let _ = worker.await;
    pool.close().await;
    tracing::info!("rental-chat stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
