// src/state.rs

use crate::config::AppConfig;
use crate::services::{ImageStore, ProductRepository};
use std::sync::Arc;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
  pub repo: Arc<dyn ProductRepository>,
  pub images: Arc<dyn ImageStore>,
  pub templates: Arc<Tera>,
  pub config: Arc<AppConfig>, // Share loaded config
}
