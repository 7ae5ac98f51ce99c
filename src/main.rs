mod api;
mod config;
mod error;
mod exec;
mod files;
mod validate;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use config::Config;

#[tokio::main]
async fn main() {
    // 1. Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scriptgate=info,tower_http=info".parse().unwrap()),
        )
        .init();

    // 2. Parse config
    let config = Arc::new(Config::from_env());

    if !config.scripts_dir.is_dir() {
        warn!(
            "scripts directory {} does not exist; every request will fail validation",
            config.scripts_dir.display()
        );
    }

    // 3. Prepare the uploads directory
    files::ensure_files_dir(&config.files_dir);

    // 4. Build API router and start server
    let app = api::router(Arc::clone(&config));

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .expect("failed to bind API listener");

    info!(
        "scriptgate ready — scripts: {}, files: {}, port: {}",
        config.scripts_dir.display(),
        config.files_dir.display(),
        config.port
    );

    axum::serve(listener, app).await.expect("server error");
}
