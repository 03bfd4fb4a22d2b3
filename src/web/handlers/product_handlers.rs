// src/web/handlers/product_handlers.rs

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{NewProduct, Product, ProductChanges};
use crate::services::ImageStore;
use crate::state::AppState;
use crate::web::forms::{OldInput, ProductForm, ValidationErrors};
use crate::web::views;

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  pub page: Option<i64>,
}

/// Template-facing projection of a product row, with its resolved public
/// image URL.
#[derive(Debug, Serialize)]
struct ProductView {
  id: Uuid,
  image: String,
  image_url: String,
  title: String,
  description: String,
  price: f64,
  stock: i32,
  created_at: DateTime<Utc>,
}

fn present(product: &Product, images: &dyn ImageStore) -> ProductView {
  ProductView {
    id: product.id,
    image: product.image.clone(),
    image_url: images.url(&product.image),
    title: product.title.clone(),
    description: product.description.clone(),
    price: product.price,
    stock: product.stock,
    created_at: product.created_at,
  }
}

// --- GET /products ---

#[instrument(name = "handler::list_products", skip(app_state, req, query_params))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  query_params: web::Query<ListProductsQuery>,
) -> Result<HttpResponse> {
  let page = query_params.page.unwrap_or(1);
  let product_page = app_state.repo.list_page(page).await?;

  let products: Vec<ProductView> = product_page
    .items
    .iter()
    .map(|p| present(p, app_state.images.as_ref()))
    .collect();

  let flash = views::take_flash(&req);
  let had_flash = flash.is_some();

  let mut context = tera::Context::new();
  context.insert("products", &products);
  context.insert("page", &product_page.page);
  context.insert("per_page", &product_page.per_page);
  context.insert("total_items", &product_page.total_items);
  context.insert("total_pages", &product_page.total_pages);
  context.insert("has_prev", &product_page.has_prev());
  context.insert("has_next", &product_page.has_next());
  context.insert("flash", &flash);

  let mut response = views::render(&app_state.templates, "index.html", &context)?;
  if had_flash {
    views::clear_flash(&mut response)?;
  }
  Ok(response)
}

// --- GET /products/create ---

#[instrument(name = "handler::create_form", skip(app_state))]
pub async fn create_form_handler(app_state: web::Data<AppState>) -> Result<HttpResponse> {
  let mut context = tera::Context::new();
  context.insert("errors", &ValidationErrors::default());
  context.insert("old", &OldInput::default());
  views::render(&app_state.templates, "create.html", &context)
}

// --- POST /products ---

#[instrument(name = "handler::create_product", skip(app_state, payload))]
pub async fn create_product_handler(app_state: web::Data<AppState>, mut payload: Multipart) -> Result<HttpResponse> {
  let form = ProductForm::from_multipart(&mut payload).await?;
  let old = form.old_values();

  let validated = match form.validate(true) {
    Ok(validated) => validated,
    Err(errors) => {
      info!("Create submission failed validation.");
      let mut context = tera::Context::new();
      context.insert("errors", &errors);
      context.insert("old", &old);
      return views::render_with_status(
        &app_state.templates,
        "create.html",
        &context,
        StatusCode::UNPROCESSABLE_ENTITY,
      );
    }
  };

  // Image validated as present and well-formed above.
  let image = validated
    .image
    .as_ref()
    .ok_or_else(|| AppError::Internal("Validated create form is missing its image.".to_string()))?;
  let extension = image.extension().unwrap_or_else(|| "png".to_string());

  // Blob first, then the row referencing it: a crash between the two leaves
  // an orphaned blob, never a row with a dangling image reference.
  let filename = app_state.images.store(&image.bytes, &extension).await?;

  let product = app_state
    .repo
    .insert(NewProduct {
      image: filename,
      title: validated.title,
      description: validated.description,
      price: validated.price,
      stock: validated.stock,
    })
    .await?;

  info!("Created product {}.", product.id);
  Ok(views::redirect_with_flash("/products", "created"))
}

// --- GET /products/{id} ---

#[instrument(name = "handler::show_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn show_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
  let product = app_state.repo.find(path.into_inner()).await?;

  let mut context = tera::Context::new();
  context.insert("product", &present(&product, app_state.images.as_ref()));
  views::render(&app_state.templates, "show.html", &context)
}

// --- GET /products/{id}/edit ---

#[instrument(name = "handler::edit_form", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn edit_form_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
  let product = app_state.repo.find(path.into_inner()).await?;

  let mut context = tera::Context::new();
  context.insert("product_id", &product.id);
  context.insert("product", &Some(present(&product, app_state.images.as_ref())));
  context.insert("errors", &ValidationErrors::default());
  context.insert("old", &OldInput::from_product(&product));
  views::render(&app_state.templates, "edit.html", &context)
}

// --- PUT/PATCH /products/{id} ---

#[instrument(name = "handler::update_product", skip(app_state, path, payload), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  mut payload: Multipart,
) -> Result<HttpResponse> {
  let form = ProductForm::from_multipart(&mut payload).await?;
  perform_update(&app_state, path.into_inner(), form).await
}

async fn perform_update(app_state: &AppState, product_id: Uuid, form: ProductForm) -> Result<HttpResponse> {
  let old = form.old_values();

  let validated = match form.validate(false) {
    Ok(validated) => validated,
    Err(errors) => {
      info!("Update submission failed validation.");
      let mut context = tera::Context::new();
      context.insert("errors", &errors);
      context.insert("old", &old);
      context.insert("product_id", &product_id);
      context.insert("product", &Option::<ProductView>::None);
      return views::render_with_status(
        &app_state.templates,
        "edit.html",
        &context,
        StatusCode::UNPROCESSABLE_ENTITY,
      );
    }
  };

  let existing = app_state.repo.find(product_id).await?;

  let new_image_name = match &validated.image {
    Some(image) => {
      let extension = image.extension().unwrap_or_else(|| "png".to_string());
      Some(app_state.images.store(&image.bytes, &extension).await?)
    }
    None => None,
  };

  let updated = app_state
    .repo
    .update(
      product_id,
      ProductChanges {
        image: new_image_name.clone(),
        title: validated.title,
        description: validated.description,
        price: validated.price,
        stock: validated.stock,
      },
    )
    .await?;

  // Remove the replaced blob only after the row mutation committed, so a
  // failure here leaves an orphaned blob rather than a row pointing at a
  // deleted one. Identical content hashes to the same name; skip deletion
  // then, or we would remove the blob we just stored.
  if let Some(new_name) = new_image_name {
    if new_name != existing.image {
      if let Err(e) = app_state.images.delete(&existing.image).await {
        warn!(error = %e, "Failed to delete replaced image blob {}.", existing.image);
      }
    }
  }

  info!("Updated product {}.", updated.id);
  Ok(views::redirect_with_flash("/products", "updated"))
}

// --- DELETE /products/{id} ---

#[instrument(name = "handler::delete_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
  perform_delete(&app_state, path.into_inner()).await
}

// --- POST /products/{id} (HTML form method override) ---

/// Browsers can only POST HTML forms; the edit and delete forms carry a
/// hidden `_method` field, dispatched here the same way the PUT/PATCH and
/// DELETE routes are. The edit form submits multipart (it carries a file
/// part), the delete form plain urlencoded; both are accepted.
#[instrument(name = "handler::post_product_override", skip(app_state, path, req, payload), fields(product_id = %path.as_ref()))]
pub async fn post_product_override_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req: HttpRequest,
  payload: web::Payload,
) -> Result<HttpResponse> {
  let product_id = path.into_inner();
  let form = ProductForm::from_request_body(&req, payload).await?;

  match form.method_override.as_deref() {
    Some("DELETE") => perform_delete(&app_state, product_id).await,
    Some("PUT") | Some("PATCH") => perform_update(&app_state, product_id, form).await,
    other => Err(AppError::Validation(format!(
      "Unsupported form method override: {:?}.",
      other
    ))),
  }
}

async fn perform_delete(app_state: &AppState, product_id: Uuid) -> Result<HttpResponse> {
  let product = app_state.repo.find(product_id).await?;

  // Row first, then the blob: a crash in between leaves an orphaned blob,
  // which is harmless, instead of a row referencing a deleted one.
  app_state.repo.delete(product_id).await?;

  if let Err(e) = app_state.images.delete(&product.image).await {
    warn!(error = %e, "Failed to delete image blob {} for removed product.", product.image);
  }

  info!("Deleted product {}.", product_id);
  Ok(views::redirect_with_flash("/products", "deleted"))
}

// --- GET /storage/products/{filename} ---

/// Serves a stored product image. The namespace is publicly readable.
#[instrument(name = "handler::serve_image", skip(app_state, path), fields(filename = %path.as_ref()))]
pub async fn serve_image_handler(app_state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
  let filename = path.into_inner();
  let bytes = app_state
    .images
    .load(&filename)
    .await
    .map_err(|_| AppError::NotFound(format!("Image {} not found.", filename)))?;

  let content_type = match filename.rsplit('.').next() {
    Some("png") => "image/png",
    Some("jpg") | Some("jpeg") => "image/jpeg",
    _ => "application/octet-stream",
  };

  Ok(HttpResponse::Ok().content_type(content_type).body(bytes))
}
