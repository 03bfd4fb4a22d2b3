// src/lib.rs

//! Product catalog web application: a server-rendered CRUD interface over a
//! relational product table and a blob store of uploaded product images.
//!
//! The handler layer is pure orchestration over two injected collaborators:
//!  - [`services::product_repository::ProductRepository`] for product rows.
//!  - [`services::image_store::ImageStore`] for image blobs under the
//!    "products" namespace.
//!
//! Integration tests substitute in-memory implementations of both.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

// Re-exports for the binary and for integration tests.
pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
