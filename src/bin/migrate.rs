//! Schema migration runner.
//!
//! Usage: `cargo run --bin migrate [NAME ...]`, or `--list` to print the
//! registered migrations. Without names every migration runs.
//!
//! Reads `DB_*` environment variables (and .env). Exits 0 on success, 1 on
//! any failure.

use qrmenu::config::DbConfig;
use qrmenu::db::Database;
use qrmenu::migrations;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "qrmenu=info,migrate=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--list") {
        for migration in migrations::all() {
            println!("{}", migration.name);
        }
        return Ok(());
    }

    match migrate(&args).await {
        Ok(()) => {
            tracing::info!("Migrations finished successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Migrations failed");
            Err(e)
        }
    }
}

/// Resolve the requested migrations, open a pool and run them. The pool is
/// closed before returning whether or not the run succeeded.
async fn migrate(args: &[String]) -> anyhow::Result<()> {
    let selected = migrations::resolve(args)?;

    let db = Database::init(&DbConfig::from_env()).await?;
    let result = run(&db, &selected).await;
    db.shutdown().await;
    result
}

async fn run(
    db: &Database,
    selected: &[&'static migrations::ColumnMigration],
) -> anyhow::Result<()> {
    migrations::run_baseline(db).await?;

    for report in migrations::run_all(db, selected).await? {
        if report.is_noop() {
            tracing::info!(migration = %report.migration, "Nothing to do, all columns exist");
        } else {
            tracing::info!(
                migration = %report.migration,
                added = ?report.added,
                "Columns added"
            );
        }
    }
    Ok(())
}
