// src/web/routes.rs

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest};

use crate::errors::AppError;
use crate::web::handlers::{button_handlers, express_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Undecodable bodies and queries still answer with the JSON failure envelope.
fn json_body_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request: {}", err)).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request: {}", err)).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/express-checkout")
          .app_data(web::JsonConfig::default().error_handler(json_body_error))
          .app_data(web::QueryConfig::default().error_handler(query_error))
          .route("/create-order", web::post().to(express_handlers::create_order_handler))
          .route("/complete-order", web::post().to(express_handlers::complete_order_handler))
          .route(
            "/fetch-order-details",
            web::post().to(express_handlers::fetch_order_details_handler),
          )
          .route("/button", web::get().to(button_handlers::express_button_handler)),
      ),
  );
}
