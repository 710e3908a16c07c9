use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.json_logs);

    let config = config::Config::load(&args.config)?;
    if let Some(account_id) = args.issue_token {
        println!("{}", config.issue_token(account_id)?);
        return Ok(());
    }
    ensure_sqlite_dir(&config.database.url);

    let db = mindmate_db::create_pool(&config.database.url, config.database.max_connections)
        .await
        .context("failed to open database")?;
    mindmate_db::run_migrations(&db)
        .await
        .context("failed to run migrations")?;
    tracing::info!(
        engine = mindmate_db::active_database_engine().as_str(),
        "database ready"
    );

    let app_config = mindmate_core::AppConfig {
        jwt_secret: config.auth.jwt_secret.clone(),
        allowed_origins: config.cors.allowed_origins.clone(),
    };
    let state = mindmate_core::AppState::new(db, app_config.clone());

    let app = mindmate_api::build_router(&app_config)
        .merge(mindmate_ws::gateway_router())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!("MindMate listening on {}", config.server.bind_address);

    let shutdown_signal = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down (ctrl-c)...");
        }
    };
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mindmate=info,tower_http=debug"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Create the parent directory of a file-backed SQLite URL.
fn ensure_sqlite_dir(url: &str) {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return;
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(':') {
        return;
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Could not create directory '{}': {}", parent.display(), e);
        }
    }
}
