// src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use checkout_flow::FlowError;
use serde_json::json;
use thiserror::Error;

use crate::services::proxy_client::ProxyError;
use crate::services::signing::SigningError;
use crate::services::stores::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),

  #[error("Security check failed")]
  Csrf,

  #[error("Your cart is empty")]
  EmptyCart,

  #[error("{0}")]
  NotFound(String),

  #[error("No PayPal server available")]
  NoServer,

  #[error(transparent)]
  Proxy(#[from] ProxyError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Storage Error: {0}")]
  Store(#[from] StoreError),

  #[error("Signing Error: {0}")]
  Signing(#[from] SigningError),

  #[error("Serialization Error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  #[error("Checkout flow was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl AppError {
  /// The message shown to the shopper. Server-side faults are not spelled out.
  pub fn user_message(&self) -> String {
    match self {
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Store(_)
      | AppError::Signing(_)
      | AppError::Serialization(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => "An internal error occurred".to_string(),
      other => other.to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::EmptyCart => StatusCode::BAD_REQUEST,
      AppError::Csrf => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::NoServer => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Proxy(_) => StatusCode::BAD_GATEWAY,
      AppError::PipelineHaltedByHandler => StatusCode::CONFLICT,
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Store(_)
      | AppError::Signing(_)
      | AppError::Serialization(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, %status, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, %status, "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "success": false,
      "data": { "message": self.user_message() }
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_facing_errors_keep_their_message() {
    assert_eq!(AppError::EmptyCart.user_message(), "Your cart is empty");
    assert_eq!(AppError::NoServer.user_message(), "No PayPal server available");
    assert_eq!(
      AppError::NotFound("Order not found".to_string()).user_message(),
      "Order not found"
    );
    assert_eq!(
      AppError::Proxy(ProxyError::Rejected("Invalid hash".to_string())).user_message(),
      "Invalid hash"
    );
  }

  #[test]
  fn internal_errors_are_masked() {
    let err = AppError::Internal("pool exhausted".to_string());
    assert_eq!(err.user_message(), "An internal error occurred");
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn status_codes_follow_error_class() {
    assert_eq!(AppError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Csrf.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::NoServer.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
      AppError::Proxy(ProxyError::Status { status: 500 }).status_code(),
      StatusCode::BAD_GATEWAY
    );
  }
}
