// src/services/product_repository.rs

//! The record store: durable product rows keyed by id, with a
//! reverse-chronological paginated listing.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{NewProduct, Product, ProductChanges, ProductPage};

/// Listing page size.
pub const PER_PAGE: i64 = 10;

/// Abstraction over product row storage so handlers stay pure orchestration
/// and tests can substitute an in-memory implementation.
#[async_trait]
pub trait ProductRepository: Send + Sync {
  /// Inserts a new row, assigning its id and creation timestamp.
  async fn insert(&self, new_product: NewProduct) -> Result<Product>;

  /// Point lookup by id. Fails with `AppError::NotFound` when absent.
  async fn find(&self, id: Uuid) -> Result<Product>;

  /// Updates the row in place. Fails with `AppError::NotFound` when absent.
  async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Product>;

  /// Deletes the row. Fails with `AppError::NotFound` when absent.
  async fn delete(&self, id: Uuid) -> Result<()>;

  /// Fetches one page of the listing, newest-first, `PER_PAGE` items per
  /// page. An out-of-range page yields an empty page, not an error.
  async fn list_page(&self, page: i64) -> Result<ProductPage>;
}

/// PostgreSQL-backed implementation over a sqlx pool.
#[derive(Clone)]
pub struct PgProductRepository {
  pool: PgPool,
}

impl PgProductRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
  #[instrument(name = "repository::insert", skip(self, new_product), fields(title = %new_product.title))]
  async fn insert(&self, new_product: NewProduct) -> Result<Product> {
    let product: Product = sqlx::query_as(
      "INSERT INTO products (image, title, description, price, stock) \
       VALUES ($1, $2, $3, $4, $5) \
       RETURNING id, image, title, description, price, stock, created_at",
    )
    .bind(&new_product.image)
    .bind(&new_product.title)
    .bind(&new_product.description)
    .bind(new_product.price)
    .bind(new_product.stock)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      error!("Failed to insert product: {}", e);
      AppError::Sqlx(e)
    })?;

    info!("Inserted product {}.", product.id);
    Ok(product)
  }

  #[instrument(name = "repository::find", skip(self), fields(product_id = %id))]
  async fn find(&self, id: Uuid) -> Result<Product> {
    let product: Option<Product> = sqlx::query_as(
      "SELECT id, image, title, description, price, stock, created_at FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;

    product.ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", id)))
  }

  #[instrument(name = "repository::update", skip(self, changes), fields(product_id = %id))]
  async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Product> {
    // COALESCE keeps the stored filename when no replacement image was
    // supplied, so the row mutation stays a single update call.
    let product: Option<Product> = sqlx::query_as(
      "UPDATE products \
       SET image = COALESCE($2, image), title = $3, description = $4, price = $5, stock = $6 \
       WHERE id = $1 \
       RETURNING id, image, title, description, price, stock, created_at",
    )
    .bind(id)
    .bind(changes.image.as_deref())
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.price)
    .bind(changes.stock)
    .fetch_optional(&self.pool)
    .await?;

    product.ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", id)))
  }

  #[instrument(name = "repository::delete", skip(self), fields(product_id = %id))]
  async fn delete(&self, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Product with ID {} not found.", id)));
    }
    info!("Deleted product {}.", id);
    Ok(())
  }

  #[instrument(name = "repository::list_page", skip(self))]
  async fn list_page(&self, page: i64) -> Result<ProductPage> {
    let page = page.max(1);

    let (total_items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
      .fetch_one(&self.pool)
      .await?;

    let items: Vec<Product> = sqlx::query_as(
      "SELECT id, image, title, description, price, stock, created_at FROM products \
       ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
    )
    .bind(PER_PAGE)
    .bind((page - 1) * PER_PAGE)
    .fetch_all(&self.pool)
    .await
    .map_err(|e| {
      error!("Failed to fetch products from database: {}", e);
      AppError::Sqlx(e)
    })?;

    info!("Fetched {} products for page {}.", items.len(), page);

    Ok(ProductPage {
      items,
      page,
      per_page: PER_PAGE,
      total_items,
      total_pages: total_pages_for(total_items),
    })
  }
}

/// Number of listing pages for a given row count; an empty table still has
/// one (empty) page, matching the listing view's expectations.
pub fn total_pages_for(total_items: i64) -> i64 {
  ((total_items + PER_PAGE - 1) / PER_PAGE).max(1)
}
