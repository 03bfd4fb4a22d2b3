// src/services/mod.rs

// Declare child modules for the injected store collaborators
pub mod image_store;
pub mod product_repository;

pub use image_store::{DiskImageStore, ImageStore};
pub use product_repository::{PgProductRepository, ProductRepository, PER_PAGE};
