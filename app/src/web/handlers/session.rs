// src/web/handlers/session.rs
use actix_web::{FromRequest, HttpRequest};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::errors::AppError;
use crate::services::csrf::EXPRESS_NONCE_ACTION;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "X-Session-Id";
pub const SESSION_COOKIE: &str = "wpppc_session";

/// The shopper's storefront session, which owns the cart and scopes CSRF tokens.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
  pub id: String,
}

impl CheckoutSession {
  /// Fails with a CSRF error unless `nonce` was issued to this session for express checkout.
  pub fn check_nonce(&self, state: &AppState, nonce: &str) -> Result<(), AppError> {
    if state.csrf.verify(nonce, &self.id, EXPRESS_NONCE_ACTION)? {
      Ok(())
    } else {
      warn!("Express checkout request with an invalid nonce.");
      Err(AppError::Csrf)
    }
  }
}

impl FromRequest for CheckoutSession {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let from_header = req
      .headers()
      .get(SESSION_HEADER)
      .and_then(|value| value.to_str().ok())
      .map(str::trim)
      .filter(|id| !id.is_empty())
      .map(str::to_string);
    let id = from_header.or_else(|| {
      req
        .cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
    });

    let result = match id {
      Some(id) => Ok(CheckoutSession { id }),
      None => {
        warn!("Request without a checkout session.");
        Err(AppError::Validation("Missing checkout session".to_string()))
      }
    };
    futures_util::future::ready(result)
  }
}

/// Order ids arrive as numbers or numeric strings.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  use serde::de::Error;

  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::Number(n) => n.as_i64().ok_or_else(|| D::Error::custom("order id out of range")),
    serde_json::Value::String(s) => s.trim().parse::<i64>().map_err(D::Error::custom),
    other => Err(D::Error::custom(format!("expected an order id, got {}", other))),
  }
}
