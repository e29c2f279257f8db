use anyhow::Context;
use axum::Router;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use backoffice::config::AppConfig;
use backoffice::shared::state::AppState;
use backoffice::shared::utils::{create_conn, run_migrations};
use backoffice::{alerts, auth, calendar, companies, directory, requests};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = AppConfig::from_env();

    let pool = create_conn(&config.database_url()).context("Failed to create database pool")?;
    run_migrations(&pool)?;

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(auth::configure_auth_routes())
        .merge(companies::configure_companies_routes())
        .merge(companies::ui::configure_companies_ui_routes())
        .merge(directory::configure_directory_routes())
        .merge(requests::configure_requests_routes())
        .merge(calendar::configure_calendar_routes())
        .merge(calendar::ui::configure_calendar_ui_routes())
        .merge(alerts::configure_alerts_routes())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
