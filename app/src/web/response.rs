// src/web/response.rs
use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

/// `{"success": true, "data": ...}`, the envelope the checkout script expects.
pub fn json_success<T: Serialize>(data: T) -> HttpResponse {
  HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}
