// src/config.rs

use crate::errors::{AppError, Result};
use crate::models::Order;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Outbound proxy calls give up after this long unless `PROXY_TIMEOUT_SECS` says otherwise.
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 30;

/// A proxy server described in the environment, used when no database is configured.
#[derive(Debug, Clone)]
pub struct SeedServer {
  pub url: String,
  pub api_key: String,
  pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Without one the service keeps orders, carts and servers in memory.
  pub database_url: Option<String>,

  /// Public storefront base URL, no trailing slash.
  pub site_url: String,
  pub gateway_enabled: bool,
  pub csrf_secret: String,
  pub proxy_timeout: Duration,

  pub asset_base_url: String,
  pub asset_version: String,
  pub debug_mode: bool,

  /// JSON list of product mappings, see `services::product_mapping`.
  pub product_mappings: Option<String>,
  pub seed_server: Option<SeedServer>,
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" | "" => Ok(false),
    other => Err(AppError::Config(format!("Invalid {} value: '{}'", name, other))),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env =
      |name: &str| lookup(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)));

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL").ok().filter(|url| !url.is_empty());

    let site_url = get_env("SITE_URL")?.trim_end_matches('/').to_string();
    let gateway_enabled = match get_env("GATEWAY_ENABLED") {
      Ok(raw) => parse_bool("GATEWAY_ENABLED", &raw)?,
      Err(_) => true,
    };
    let csrf_secret = get_env("CSRF_SECRET")?;
    if csrf_secret.len() < 16 {
      return Err(AppError::Config("CSRF_SECRET must be at least 16 characters".to_string()));
    }

    let proxy_timeout_secs = get_env("PROXY_TIMEOUT_SECS")
      .unwrap_or_else(|_| DEFAULT_PROXY_TIMEOUT_SECS.to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid PROXY_TIMEOUT_SECS: {}", e)))?;

    let asset_base_url = get_env("ASSET_BASE_URL")
      .unwrap_or_else(|_| format!("{}/assets", site_url))
      .trim_end_matches('/')
      .to_string();
    let asset_version = get_env("ASSET_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
    let debug_mode = match get_env("DEBUG_MODE") {
      Ok(raw) => parse_bool("DEBUG_MODE", &raw)?,
      Err(_) => false,
    };

    let product_mappings = get_env("PRODUCT_MAPPINGS").ok().filter(|raw| !raw.trim().is_empty());

    let seed_server = match (get_env("PROXY_SERVER_URL"), get_env("PROXY_API_KEY"), get_env("PROXY_API_SECRET")) {
      (Ok(url), Ok(api_key), Ok(api_secret)) => Some(SeedServer { url, api_key, api_secret }),
      _ => None,
    };

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      site_url,
      gateway_enabled,
      csrf_secret,
      proxy_timeout: Duration::from_secs(proxy_timeout_secs),
      asset_base_url,
      asset_version,
      debug_mode,
      product_mappings,
      seed_server,
    })
  }

  pub fn checkout_url(&self) -> String {
    format!("{}/checkout/", self.site_url)
  }

  pub fn cart_url(&self) -> String {
    format!("{}/cart/", self.site_url)
  }

  /// Where the proxy asks for shipping options while the PayPal popup is open.
  pub fn shipping_callback_url(&self) -> String {
    format!("{}/wp-json/wppps/v1/shipping-callback", self.site_url)
  }

  /// Endpoint the express button script posts to.
  pub fn ajax_url(&self) -> String {
    format!("{}/api/v1/express-checkout", self.site_url)
  }

  pub fn order_received_url(&self, order: &Order) -> String {
    format!("{}/checkout/order-received/{}/?key={}", self.site_url, order.id, order.order_key)
  }
}
