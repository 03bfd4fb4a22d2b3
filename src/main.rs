// src/main.rs

use product_catalog::config::AppConfig;
use product_catalog::services::{DiskImageStore, PgProductRepository};
use product_catalog::state::AppState;
use product_catalog::web::configure_app_routes;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tera::Tera;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize tracing subscriber for logging
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO) // Default level
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting product catalog server...");

  // Load application configuration
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  // Initialize Database Pool
  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
    tracing::error!(error = %e, "Failed to run database migrations.");
    panic!("Migration error: {}", e);
  }
  tracing::info!("Database migrations applied.");

  // Load templates once; handlers render from the shared instance.
  let templates = match Tera::new(&format!("{}/**/*.html", app_config.templates_dir)) {
    Ok(t) => t,
    Err(e) => {
      tracing::error!(error = %e, "Failed to load templates.");
      panic!("Template loading error: {}", e);
    }
  };

  // Create AppState with the two injected store collaborators
  let app_state = AppState {
    repo: Arc::new(PgProductRepository::new(db_pool.clone())),
    images: Arc::new(DiskImageStore::new(&app_config.upload_dir)),
    templates: Arc::new(templates),
    config: app_config.clone(),
  };

  // Configure and Start Actix Web Server
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
