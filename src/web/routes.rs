// src/web/routes.rs

use actix_web::web;

use crate::web::handlers::product_handlers;

// Simple liveness probe; the catalog has no critical downstream beyond the
// database pool, which surfaces through handler errors anyway.
async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called in `main.rs` (and by the integration tests) to configure services
// for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/products")
        .route("", web::get().to(product_handlers::list_products_handler))
        .route("", web::post().to(product_handlers::create_product_handler))
        // Registered ahead of the `{product_id}` routes so "create" is not
        // captured as an id.
        .route("/create", web::get().to(product_handlers::create_form_handler))
        .route("/{product_id}", web::get().to(product_handlers::show_product_handler))
        .route("/{product_id}/edit", web::get().to(product_handlers::edit_form_handler))
        .route("/{product_id}", web::put().to(product_handlers::update_product_handler))
        .route("/{product_id}", web::patch().to(product_handlers::update_product_handler))
        .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler))
        // HTML forms can only POST; a hidden `_method` field selects the verb.
        .route("/{product_id}", web::post().to(product_handlers::post_product_override_handler)),
    )
    // Stored product images are publicly readable.
    .route(
      "/storage/products/{filename}",
      web::get().to(product_handlers::serve_image_handler),
    );
}
