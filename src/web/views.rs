// src/web/views.rs

//! Template rendering and flash-notice helpers. A flash notice is a one-time
//! message carried across a redirect in a cookie, shown on the next rendered
//! listing only. The cookie stores a short key rather than the message text
//! to stay within cookie-value character rules.

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse};
use tera::{Context, Tera};

use crate::errors::{AppError, Result};

pub const FLASH_COOKIE: &str = "flash";

/// Maps a flash key set by a mutating handler to the notice text shown on
/// the next listing render. Unknown keys render nothing.
pub fn flash_message(key: &str) -> Option<&'static str> {
  match key {
    "created" => Some("Product created successfully."),
    "updated" => Some("Product updated successfully."),
    "deleted" => Some("Product deleted successfully."),
    _ => None,
  }
}

pub fn render(templates: &Tera, name: &str, context: &Context) -> Result<HttpResponse> {
  render_with_status(templates, name, context, StatusCode::OK)
}

pub fn render_with_status(templates: &Tera, name: &str, context: &Context, status: StatusCode) -> Result<HttpResponse> {
  let body = templates.render(name, context)?;
  Ok(
    HttpResponse::build(status)
      .content_type("text/html; charset=utf-8")
      .body(body),
  )
}

/// 303 redirect carrying a flash key for the next render.
pub fn redirect_with_flash(location: &str, flash_key: &str) -> HttpResponse {
  HttpResponse::SeeOther()
    .insert_header((header::LOCATION, location.to_string()))
    .cookie(Cookie::build(FLASH_COOKIE, flash_key).path("/").finish())
    .finish()
}

/// Reads the pending flash notice from the request, if any. The caller is
/// responsible for clearing the cookie on its response via
/// [`clear_flash`].
pub fn take_flash(req: &HttpRequest) -> Option<String> {
  req
    .cookie(FLASH_COOKIE)
    .and_then(|c| flash_message(c.value()).map(str::to_string))
}

pub fn clear_flash(response: &mut HttpResponse) -> Result<()> {
  let cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
  response
    .add_removal_cookie(&cookie)
    .map_err(|e| AppError::Internal(format!("Failed to clear flash cookie: {}", e)))
}
