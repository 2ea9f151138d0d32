// src/models/server.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Path prefix of the proxy server's REST API.
pub const PROXY_API_PREFIX: &str = "wp-json/wppps/v1";

/// A proxy server (Website B) that fronts PayPal for this storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProxyServer {
  pub id: i64,
  pub name: String,
  pub url: String,
  pub api_key: String,
  #[serde(skip_serializing)]
  pub api_secret: String,
  pub is_active: bool,
  pub is_selected: bool,
  /// Zero means unlimited.
  pub capacity_limit: Decimal,
  pub current_usage: Decimal,
  pub priority: i32,
}

impl ProxyServer {
  pub fn endpoint(&self, name: &str) -> String {
    format!("{}/{}/{}", self.url.trim_end_matches('/'), PROXY_API_PREFIX, name)
  }

  pub fn has_capacity(&self) -> bool {
    self.capacity_limit.is_zero() || self.current_usage < self.capacity_limit
  }
}
