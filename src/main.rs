use anyhow::Result;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use recordesk_backend::config::Config;
use recordesk_backend::routes;
use recordesk_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "recordesk_backend=debug,tower_http=debug".to_string()),
        )
        .init();

    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => {
            let config = Config::load(&path)?;
            info!("Loaded configuration from {}", path);
            config
        }
        Err(_) => match Config::load("conf.yaml") {
            Ok(config) => {
                info!("Loaded configuration from conf.yaml");
                config
            }
            Err(_) => {
                info!("No config file found; using defaults and environment");
                Config::from_env()
            }
        },
    };

    let state = AppState::new(config.clone());

    let app = routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!(
        "{}:{}",
        config.system_config.host, config.system_config.port
    )
    .parse()?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
