use std::net::SocketAddr;

use mimalloc::MiMalloc;
use qrmenu::config::AppConfig;
use qrmenu::db::Database;
use qrmenu::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// M-MIMALLOC-APP: Use mimalloc as global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qrmenu=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env();
    tracing::debug!(?config, "Configuration loaded");

    let db = Database::init_lazy(&config.db);
    let state = AppState {
        db: db.clone(),
        config: config.clone(),
    };

    let host: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(host = %addr, "Starting QR menu service");

    let app = qrmenu::routes::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    db.shutdown().await;
    Ok(())
}
