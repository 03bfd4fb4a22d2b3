// tests/common/mod.rs

//! Shared test harness: in-memory implementations of both store
//! collaborators, an `AppState` wired to them, and a hand-rolled multipart
//! body builder for exercising the form handlers.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tera::Tera;
use uuid::Uuid;

use product_catalog::config::AppConfig;
use product_catalog::errors::{AppError, Result};
use product_catalog::models::{NewProduct, Product, ProductChanges, ProductPage};
use product_catalog::services::image_store::{hashed_filename, ImageStore, PRODUCTS_NAMESPACE};
use product_catalog::services::product_repository::{total_pages_for, ProductRepository, PER_PAGE};
use product_catalog::state::AppState;

/// In-memory record store. Creation timestamps are synthesized strictly
/// increasing so the newest-first listing order is deterministic.
#[derive(Default)]
pub struct InMemoryProductRepository {
  rows: Mutex<Vec<Product>>,
  sequence: AtomicI64,
}

impl InMemoryProductRepository {
  pub fn count(&self) -> usize {
    self.rows.lock().unwrap().len()
  }

  pub fn all(&self) -> Vec<Product> {
    self.rows.lock().unwrap().clone()
  }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
  async fn insert(&self, new_product: NewProduct) -> Result<Product> {
    let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
    let product = Product {
      id: Uuid::new_v4(),
      image: new_product.image,
      title: new_product.title,
      description: new_product.description,
      price: new_product.price,
      stock: new_product.stock,
      created_at: Utc::now() + Duration::seconds(seq),
    };
    self.rows.lock().unwrap().push(product.clone());
    Ok(product)
  }

  async fn find(&self, id: Uuid) -> Result<Product> {
    self
      .rows
      .lock()
      .unwrap()
      .iter()
      .find(|p| p.id == id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", id)))
  }

  async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Product> {
    let mut rows = self.rows.lock().unwrap();
    let product = rows
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", id)))?;
    if let Some(image) = changes.image {
      product.image = image;
    }
    product.title = changes.title;
    product.description = changes.description;
    product.price = changes.price;
    product.stock = changes.stock;
    Ok(product.clone())
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let mut rows = self.rows.lock().unwrap();
    let before = rows.len();
    rows.retain(|p| p.id != id);
    if rows.len() == before {
      return Err(AppError::NotFound(format!("Product with ID {} not found.", id)));
    }
    Ok(())
  }

  async fn list_page(&self, page: i64) -> Result<ProductPage> {
    let page = page.max(1);
    let rows = self.rows.lock().unwrap();
    let total_items = rows.len() as i64;
    let items: Vec<Product> = rows
      .iter()
      .rev()
      .skip(((page - 1) * PER_PAGE) as usize)
      .take(PER_PAGE as usize)
      .cloned()
      .collect();
    Ok(ProductPage {
      items,
      page,
      per_page: PER_PAGE,
      total_items,
      total_pages: total_pages_for(total_items),
    })
  }
}

/// In-memory file store keyed by the same content-derived names the disk
/// store uses.
#[derive(Default)]
pub struct InMemoryImageStore {
  blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
  pub fn contains(&self, filename: &str) -> bool {
    self.blobs.lock().unwrap().contains_key(filename)
  }

  pub fn count(&self) -> usize {
    self.blobs.lock().unwrap().len()
  }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
  async fn store(&self, bytes: &[u8], extension: &str) -> Result<String> {
    let filename = hashed_filename(bytes, extension);
    self.blobs.lock().unwrap().insert(filename.clone(), bytes.to_vec());
    Ok(filename)
  }

  async fn load(&self, filename: &str) -> Result<Vec<u8>> {
    self
      .blobs
      .lock()
      .unwrap()
      .get(filename)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Image {} not found.", filename)))
  }

  async fn delete(&self, filename: &str) -> Result<()> {
    self.blobs.lock().unwrap().remove(filename);
    Ok(())
  }

  fn url(&self, filename: &str) -> String {
    format!("/storage/{}/{}", PRODUCTS_NAMESPACE, filename)
  }
}

pub struct TestHarness {
  pub state: AppState,
  pub repo: Arc<InMemoryProductRepository>,
  pub images: Arc<InMemoryImageStore>,
}

pub fn harness() -> TestHarness {
  let repo = Arc::new(InMemoryProductRepository::default());
  let images = Arc::new(InMemoryImageStore::default());
  let templates = Tera::new("templates/**/*.html").expect("templates should load");
  let config = AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "postgres://unused".to_string(),
    app_base_url: "http://127.0.0.1".to_string(),
    upload_dir: "storage".to_string(),
    templates_dir: "templates".to_string(),
  };
  let state = AppState {
    repo: repo.clone(),
    images: images.clone(),
    templates: Arc::new(templates),
    config: Arc::new(config),
  };
  TestHarness { state, repo, images }
}

pub const BOUNDARY: &str = "----catalog-test-boundary";

/// Builds a multipart/form-data body from text fields plus an optional
/// `image` file part. Returns the content-type header value and the body.
pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
  let mut body: Vec<u8> = Vec::new();

  for (name, value) in fields {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
  }

  if let Some((filename, bytes)) = image {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
      format!(
        "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
        filename
      )
      .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }

  body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

  let content_type = format!("multipart/form-data; boundary={}", BOUNDARY);
  (content_type, body)
}

/// The standard valid field set used across tests.
pub fn valid_fields() -> Vec<(&'static str, &'static str)> {
  vec![
    ("title", "Wireless Mouse"),
    ("description", "A comfortable wireless mouse."),
    ("price", "19.99"),
    ("stock", "25"),
  ]
}
