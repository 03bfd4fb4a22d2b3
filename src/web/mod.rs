// src/web/mod.rs

// Declare child modules
pub mod forms;
pub mod handlers;
pub mod routes;
pub mod views;

// Re-export routing configuration so main.rs and tests can reach it easily.
pub use routes::configure_app_routes;
