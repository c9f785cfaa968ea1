use dotenvy::dotenv;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;
use jobs::spawn_all_jobs;
use state::AppState;

pub mod app;
pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod devices;
pub mod directory;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod notification;
pub mod otp;
pub mod payment;
pub mod state;
pub mod swagger;
pub mod utils;

pub async fn start_web_server() -> anyhow::Result<()> {
    // import .env file
    dotenv().ok();
    initialize_logging();
    let config = AppConfig::from_env();
    let state = AppState::from_config(&config).await?;
    spawn_all_jobs(&state, &config);
    start_server(state, config.port).await
}

fn initialize_logging() {
    // create default env filter
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or("payment_otp_service=debug,tower_http=debug".into());

    // initialize tracing subscriber for logging
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    // build the socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    // create the app instance
    let app = app::build_app(state);
    tracing::debug!("Starting the app in: {addr}");
    // start serving the app in the socket address
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
