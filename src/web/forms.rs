// src/web/forms.rs

//! Multipart form extraction and validation for the create/update product
//! forms. The handler receives the raw submitted fields as a [`ProductForm`]
//! and validates them into a [`ValidatedProduct`]; on failure the raw values
//! are echoed back into the re-rendered form.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use futures_util::StreamExt as _;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{AppError, Result};
use crate::models::Product;

/// Upload size ceiling: 2048 KB.
pub const MAX_IMAGE_BYTES: usize = 2048 * 1024;

/// Accepted image file extensions.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

const FIELD_NAMES: [&str; 5] = ["image", "title", "description", "price", "stock"];

/// An uploaded image file as received from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedImage {
  pub filename: String,
  pub bytes: Vec<u8>,
}

impl UploadedImage {
  pub fn extension(&self) -> Option<String> {
    Path::new(&self.filename)
      .extension()
      .map(|e| e.to_string_lossy().to_ascii_lowercase())
  }
}

/// Field-level validation messages, keyed by field name. Every known field
/// key is always present (possibly empty) so templates can index
/// unconditionally.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrors {
  #[serde(flatten)]
  messages: BTreeMap<String, Vec<String>>,
}

impl Default for ValidationErrors {
  fn default() -> Self {
    let mut messages = BTreeMap::new();
    for field in FIELD_NAMES {
      messages.insert(field.to_string(), Vec::new());
    }
    Self { messages }
  }
}

impl ValidationErrors {
  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.messages.entry(field.to_string()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.messages.values().all(Vec::is_empty)
  }
}

/// The raw submitted form, before validation. Text fields are trimmed;
/// fields that were absent or blank are `None`.
#[derive(Debug, Default)]
pub struct ProductForm {
  pub title: Option<String>,
  pub description: Option<String>,
  pub price: Option<String>,
  pub stock: Option<String>,
  pub image: Option<UploadedImage>,
  /// HTML forms can only POST; a hidden `_method` field spoofs PUT, PATCH
  /// and DELETE the way the routes expect them.
  pub method_override: Option<String>,
}

/// The validated field set a handler works with. `image` is `None` only when
/// the form legitimately omitted it (update without a replacement image).
#[derive(Debug)]
pub struct ValidatedProduct {
  pub title: String,
  pub description: String,
  pub price: f64,
  pub stock: i32,
  pub image: Option<UploadedImage>,
}

/// The submitted text values, echoed back when re-rendering a form after a
/// validation failure (and used to pre-fill the edit form).
#[derive(Debug, Default, Serialize)]
pub struct OldInput {
  pub title: String,
  pub description: String,
  pub price: String,
  pub stock: String,
}

impl OldInput {
  pub fn from_product(product: &Product) -> Self {
    Self {
      title: product.title.clone(),
      description: product.description.clone(),
      price: product.price.to_string(),
      stock: product.stock.to_string(),
    }
  }
}

impl ProductForm {
  /// Drains a form submission in either encoding an HTML form can produce:
  /// multipart (the create/edit forms, which carry a file part) or
  /// urlencoded (the delete form, which carries only `_method`).
  pub async fn from_request_body(req: &HttpRequest, payload: web::Payload) -> Result<Self> {
    let content_type = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
      let mut multipart = Multipart::new(req.headers(), payload);
      return Self::from_multipart(&mut multipart).await;
    }

    let mut body: Vec<u8> = Vec::new();
    let mut payload = payload;
    while let Some(chunk) = payload.next().await {
      let chunk = chunk.map_err(|e| AppError::Validation(format!("Malformed form request: {}", e)))?;
      body.extend_from_slice(&chunk);
    }
    Ok(Self::from_urlencoded(&body))
  }

  /// Parses a classic `application/x-www-form-urlencoded` body. No file
  /// can arrive this way, so only the text fields are populated.
  pub fn from_urlencoded(body: &[u8]) -> Self {
    let mut form = ProductForm::default();
    for (name, value) in url::form_urlencoded::parse(body) {
      form.set_text_field(&name, value.into_owned().into_bytes());
    }
    form
  }

  /// Drains an inbound multipart payload into a `ProductForm`. Unknown
  /// fields are ignored; a malformed body is a validation error.
  pub async fn from_multipart(payload: &mut Multipart) -> Result<Self> {
    let mut form = ProductForm::default();

    while let Some(item) = payload.next().await {
      let mut field = item.map_err(|e| AppError::Validation(format!("Malformed multipart request: {}", e)))?;
      let disposition = field.content_disposition();
      let name = disposition.get_name().unwrap_or_default().to_string();
      let filename = disposition.get_filename().map(str::to_string);
      let is_image = name == "image";

      let mut data: Vec<u8> = Vec::new();
      while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("Malformed multipart request: {}", e)))?;
        if is_image {
          // Buffer at most one byte past the size ceiling; that is enough
          // for the size rule to fire, and the rest of an oversized upload
          // is drained without being held in memory.
          if data.len() <= MAX_IMAGE_BYTES {
            let room = MAX_IMAGE_BYTES + 1 - data.len();
            data.extend_from_slice(&chunk[..chunk.len().min(room)]);
          }
        } else {
          data.extend_from_slice(&chunk);
        }
      }

      if is_image {
        // Browsers submit an empty file part when no file was chosen;
        // treat that the same as an omitted image.
        if let Some(filename) = filename.filter(|f| !f.is_empty()) {
          if !data.is_empty() {
            form.image = Some(UploadedImage { filename, bytes: data });
          }
        }
      } else {
        form.set_text_field(&name, data);
      }
    }

    Ok(form)
  }

  fn set_text_field(&mut self, name: &str, data: Vec<u8>) {
    match name {
      "title" => self.title = text_value(data),
      "description" => self.description = text_value(data),
      "price" => self.price = text_value(data),
      "stock" => self.stock = text_value(data),
      "_method" => self.method_override = text_value(data).map(|m| m.to_ascii_uppercase()),
      _ => {}
    }
  }

  /// Applies the field rules: title >= 5 chars, description >= 10 chars,
  /// numeric price and stock, and a jpeg/jpg/png image of at most 2048 KB
  /// (mandatory only when `image_required`).
  pub fn validate(self, image_required: bool) -> std::result::Result<ValidatedProduct, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    match &self.title {
      None => errors.add("title", "The title field is required."),
      Some(t) if t.chars().count() < 5 => errors.add("title", "The title must be at least 5 characters."),
      _ => {}
    }

    match &self.description {
      None => errors.add("description", "The description field is required."),
      Some(d) if d.chars().count() < 10 => {
        errors.add("description", "The description must be at least 10 characters.")
      }
      _ => {}
    }

    let price = match &self.price {
      None => {
        errors.add("price", "The price field is required.");
        None
      }
      Some(p) => match p.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
          errors.add("price", "The price must be a number.");
          None
        }
      },
    };

    let stock = match &self.stock {
      None => {
        errors.add("stock", "The stock field is required.");
        None
      }
      Some(s) => match s.parse::<i32>() {
        Ok(v) => Some(v),
        Err(_) => {
          errors.add("stock", "The stock must be a number.");
          None
        }
      },
    };

    match &self.image {
      None if image_required => errors.add("image", "The image field is required."),
      None => {}
      Some(image) => {
        let extension_ok = image
          .extension()
          .map(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
          .unwrap_or(false);
        if !extension_ok {
          errors.add("image", "The image must be a file of type: jpeg, jpg, png.");
        }
        if image.bytes.len() > MAX_IMAGE_BYTES {
          errors.add("image", "The image may not be greater than 2048 kilobytes.");
        }
      }
    }

    if !errors.is_empty() {
      return Err(errors);
    }

    Ok(ValidatedProduct {
      title: self.title.unwrap_or_default(),
      description: self.description.unwrap_or_default(),
      price: price.unwrap_or_default(),
      stock: stock.unwrap_or_default(),
      image: self.image,
    })
  }

  pub fn old_values(&self) -> OldInput {
    OldInput {
      title: self.title.clone().unwrap_or_default(),
      description: self.description.clone().unwrap_or_default(),
      price: self.price.clone().unwrap_or_default(),
      stock: self.stock.clone().unwrap_or_default(),
    }
  }
}

fn text_value(data: Vec<u8>) -> Option<String> {
  let value = String::from_utf8_lossy(&data).trim().to_string();
  if value.is_empty() {
    None
  } else {
    Some(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid_form(image: Option<UploadedImage>) -> ProductForm {
    ProductForm {
      title: Some("Wireless Mouse".to_string()),
      description: Some("A comfortable wireless mouse.".to_string()),
      price: Some("19.99".to_string()),
      stock: Some("25".to_string()),
      image,
      method_override: None,
    }
  }

  fn png_image(bytes: &[u8]) -> UploadedImage {
    UploadedImage {
      filename: "photo.png".to_string(),
      bytes: bytes.to_vec(),
    }
  }

  #[test]
  fn accepts_a_fully_valid_create_form() {
    let validated = valid_form(Some(png_image(b"png bytes"))).validate(true).unwrap();
    assert_eq!(validated.title, "Wireless Mouse");
    assert_eq!(validated.price, 19.99);
    assert_eq!(validated.stock, 25);
    assert!(validated.image.is_some());
  }

  #[test]
  fn rejects_short_title() {
    let mut form = valid_form(Some(png_image(b"x")));
    form.title = Some("Abc".to_string());
    let errors = form.validate(true).unwrap_err();
    assert!(!errors.is_empty());
  }

  #[test]
  fn rejects_short_description() {
    let mut form = valid_form(Some(png_image(b"x")));
    form.description = Some("too short".to_string());
    assert!(form.validate(true).is_err());
  }

  #[test]
  fn rejects_non_numeric_price_and_stock() {
    let mut form = valid_form(Some(png_image(b"x")));
    form.price = Some("free".to_string());
    form.stock = Some("many".to_string());
    let errors = form.validate(true).unwrap_err();
    assert!(!errors.is_empty());
  }

  #[test]
  fn rejects_missing_required_fields() {
    let form = ProductForm::default();
    assert!(form.validate(true).is_err());
  }

  #[test]
  fn requires_image_on_create_but_not_update() {
    assert!(valid_form(None).validate(true).is_err());
    let validated = valid_form(None).validate(false).unwrap();
    assert!(validated.image.is_none());
  }

  #[test]
  fn rejects_disallowed_image_extension() {
    let image = UploadedImage {
      filename: "document.gif".to_string(),
      bytes: b"gif".to_vec(),
    };
    assert!(valid_form(Some(image)).validate(true).is_err());
  }

  #[test]
  fn rejects_oversized_image() {
    let image = png_image(&vec![0u8; MAX_IMAGE_BYTES + 1]);
    assert!(valid_form(Some(image)).validate(true).is_err());
  }

  #[test]
  fn parses_urlencoded_body_with_method_override() {
    let form = ProductForm::from_urlencoded(b"_method=DELETE&title=Spare+title");
    assert_eq!(form.method_override.as_deref(), Some("DELETE"));
    assert_eq!(form.title.as_deref(), Some("Spare title"));
    assert!(form.image.is_none());
  }

  #[test]
  fn urlencoded_body_decodes_percent_escapes() {
    let form = ProductForm::from_urlencoded(b"description=50%25+off+this+week");
    assert_eq!(form.description.as_deref(), Some("50% off this week"));
  }

  #[test]
  fn accepts_uppercase_extensions() {
    let image = UploadedImage {
      filename: "PHOTO.JPG".to_string(),
      bytes: b"jpg".to_vec(),
    };
    assert!(valid_form(Some(image)).validate(true).is_ok());
  }
}
