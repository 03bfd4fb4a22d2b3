// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A catalog product. `image` names a blob in the image store's "products"
/// namespace; it is mandatory at creation and never removable afterwards.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub image: String,
  pub title: String,
  pub description: String,
  pub price: f64,
  pub stock: i32,
  pub created_at: DateTime<Utc>,
}

/// Field set for inserting a new product. The id and creation timestamp are
/// assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewProduct {
  pub image: String,
  pub title: String,
  pub description: String,
  pub price: f64,
  pub stock: i32,
}

/// Field set for updating an existing product. `image` is `None` when the
/// caller did not supply a replacement image; the stored filename is then
/// left untouched.
#[derive(Debug, Clone)]
pub struct ProductChanges {
  pub image: Option<String>,
  pub title: String,
  pub description: String,
  pub price: f64,
  pub stock: i32,
}

/// One page of the reverse-chronological product listing, with the metadata
/// the listing view needs to render pagination links.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
  pub items: Vec<Product>,
  pub page: i64,
  pub per_page: i64,
  pub total_items: i64,
  pub total_pages: i64,
}

impl ProductPage {
  pub fn has_prev(&self) -> bool {
    self.page > 1
  }

  pub fn has_next(&self) -> bool {
    self.page < self.total_pages
  }
}
