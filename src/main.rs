mod app;
mod auth;
mod config;
mod db;
mod designs;
mod error;
mod state;
#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "designboard=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::info!(
        development = config.auth.development,
        base_url = %config.auth.base_url,
        "configuration loaded"
    );
    if config.auth.session_secret.is_fallback() || config.auth.access_token_secret.is_fallback() {
        tracing::warn!("using the development fallback signing secret; set NEXTAUTH_SECRET and JWT_SECRET");
    }
    if config.mongo.uri.is_none() {
        tracing::warn!("MONGODB_URI is not set; credentials sign-in is disabled and design listing will fail");
    }

    let addr = config.listen_addr()?;
    let state = AppState::init(config)?;
    app::serve(app::build_app(state), addr).await
}
