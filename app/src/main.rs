// src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use express_checkout::config::AppConfig;
use express_checkout::errors::AppError;
use express_checkout::models::ProxyServer;
use express_checkout::services::stores::{
  self, CartStore, InMemoryCartStore, InMemoryOrderStore, InMemoryServerDirectory, OrderStore, PgCartStore,
  PgOrderStore, PgServerDirectory, ServerDirectory,
};
use express_checkout::state::AppState;
use express_checkout::web::configure_app_routes;
use rust_decimal::Decimal;

type Stores = (Arc<dyn OrderStore>, Arc<dyn CartStore>, Arc<dyn ServerDirectory>);

const SEED_SERVER_NAME: &str = "Default proxy";

async fn connect_stores(config: &AppConfig) -> Result<Stores, AppError> {
  let Some(database_url) = config.database_url.as_deref() else {
    tracing::warn!("DATABASE_URL not set; orders, carts and servers are kept in memory.");
    let servers = config
      .seed_server
      .iter()
      .map(|seed| ProxyServer {
        id: 1,
        name: SEED_SERVER_NAME.to_string(),
        url: seed.url.clone(),
        api_key: seed.api_key.clone(),
        api_secret: seed.api_secret.clone(),
        is_active: true,
        is_selected: true,
        capacity_limit: Decimal::ZERO,
        current_usage: Decimal::ZERO,
        priority: 0,
      })
      .collect();
    return Ok((
      Arc::new(InMemoryOrderStore::new()),
      Arc::new(InMemoryCartStore::new()),
      Arc::new(InMemoryServerDirectory::new(servers)),
    ));
  };

  let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
  tracing::info!("Successfully connected to the database.");
  stores::postgres::migrate(&pool).await?;

  let directory = PgServerDirectory::new(pool.clone());
  if let Some(seed) = &config.seed_server {
    let server_id = directory
      .ensure_server(SEED_SERVER_NAME, &seed.url, &seed.api_key, &seed.api_secret)
      .await?;
    tracing::info!(server_id, "Proxy server from environment registered.");
  }

  Ok((
    Arc::new(PgOrderStore::new(pool.clone())),
    Arc::new(PgCartStore::new(pool)),
    Arc::new(directory),
  ))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting express checkout server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let (orders, carts, servers) = connect_stores(&app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to initialise storage.");
    std::io::Error::other(e.to_string())
  })?;

  let app_state = AppState::build(app_config.clone(), orders, carts, servers).map_err(|e| {
    tracing::error!(error = %e, "Failed to build application state.");
    std::io::Error::other(e.to_string())
  })?;
  tracing::info!(routes = ?app_state.flows.routes(), "Checkout flows ready.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
