// src/services/proxy_client.rs

//! Signed JSON calls to the proxy server's REST API.
//!
//! Every request carries `api_key`, a unix `timestamp` and a `hash` computed
//! with the server's `api_secret` over fields that depend on the endpoint. A
//! reply counts as successful only when it is HTTP 200, a JSON object, and has
//! `"success": true`.

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::models::paypal::PayPalOrderDetails;
use crate::models::payloads::{encode_order_data, ExpressOrderData, MirrorOrderData};
use crate::models::ProxyServer;
use crate::services::signing::{self, SigningError};

pub const CREATE_EXPRESS_CHECKOUT: &str = "create-express-checkout";
pub const CAPTURE_EXPRESS_PAYMENT: &str = "capture-express-payment";
pub const GET_PAYPAL_ORDER: &str = "get-paypal-order";
pub const MIRROR_ORDER: &str = "mirror-order";
pub const EXPRESS_BUTTONS: &str = "express-checkout-buttons";

/// Seller protection recorded when the proxy does not report one.
pub const UNKNOWN_SELLER_PROTECTION: &str = "UNKNOWN";

#[derive(Debug, Error)]
pub enum ProxyError {
  #[error("Error communicating with proxy server: {0}")]
  Transport(String),

  #[error("Proxy server returned error code: {status}")]
  Status { status: u16 },

  #[error("Malformed response from proxy server: {0}")]
  Malformed(String),

  /// The proxy answered but declined; carries its message.
  #[error("{0}")]
  Rejected(String),

  #[error("No {} received from proxy server", field_label(.0))]
  MissingField(&'static str),

  #[error("No order details in response")]
  NoOrderDetails,

  #[error("Unable to sign proxy request: {0}")]
  Signing(#[from] SigningError),

  #[error("Unable to encode proxy request: {0}")]
  Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayPalOrder {
  pub paypal_order_id: String,
  pub approve_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPayment {
  pub transaction_id: String,
  pub seller_protection: String,
}

/// Query parameters the express button iframe is opened with.
#[derive(Debug, Clone)]
pub struct ButtonFrameParams<'a> {
  pub currency: &'a str,
  pub amount: &'a str,
  pub needs_shipping: bool,
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
  client: reqwest::Client,
}

fn field_label(key: &str) -> &str {
  match key {
    "paypal_order_id" => "PayPal order ID",
    "transaction_id" => "transaction ID",
    other => other,
  }
}

fn timestamp() -> String {
  Utc::now().timestamp().to_string()
}

/// A required, non-empty string field of a reply. Numeric ids are accepted as text.
fn required_str(fields: &Map<String, Value>, key: &'static str) -> Result<String, ProxyError> {
  optional_str(fields, key).ok_or(ProxyError::MissingField(key))
}

fn optional_str(fields: &Map<String, Value>, key: &str) -> Option<String> {
  match fields.get(key)? {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

impl ProxyClient {
  pub fn new(timeout: Duration) -> Result<Self, ProxyError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ProxyError::Transport(e.to_string()))?;
    Ok(Self { client })
  }

  #[instrument(name = "proxy::post", skip(self, server, body), fields(server_id = server.id), err(Display))]
  async fn post(&self, server: &ProxyServer, endpoint: &str, body: &Value) -> Result<Map<String, Value>, ProxyError> {
    let url = server.endpoint(endpoint);
    let response = self
      .client
      .post(&url)
      .json(body)
      .send()
      .await
      .map_err(|e| ProxyError::Transport(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
      return Err(ProxyError::Status { status: status.as_u16() });
    }

    let text = response.text().await.map_err(|e| ProxyError::Transport(e.to_string()))?;
    let reply: Value = serde_json::from_str(&text).map_err(|e| ProxyError::Malformed(e.to_string()))?;
    let Value::Object(fields) = reply else {
      return Err(ProxyError::Malformed("expected a JSON object".to_string()));
    };

    if fields.get("success").and_then(Value::as_bool) != Some(true) {
      let message = fields
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("Unknown error from proxy server");
      return Err(ProxyError::Rejected(message.to_string()));
    }

    debug!("Proxy call succeeded.");
    Ok(fields)
  }

  /// Asks the proxy to open a PayPal order for `data`.
  ///
  /// `hash = HMAC(secret, timestamp ‖ order_id ‖ order_total ‖ api_key)`.
  pub async fn create_express_checkout(
    &self,
    server: &ProxyServer,
    data: &ExpressOrderData,
  ) -> Result<CreatedPayPalOrder, ProxyError> {
    let timestamp = timestamp();
    let order_id = data.order_id.to_string();
    let order_total = data.order_total.to_string();
    let hash = signing::sign(
      &server.api_secret,
      &[timestamp.as_str(), order_id.as_str(), order_total.as_str(), server.api_key.as_str()],
    )?;

    let body = json!({
      "api_key": server.api_key,
      "timestamp": timestamp,
      "hash": hash,
      "order_data": encode_order_data(data)?,
    });
    let fields = self.post(server, CREATE_EXPRESS_CHECKOUT, &body).await?;

    Ok(CreatedPayPalOrder {
      paypal_order_id: required_str(&fields, "paypal_order_id")?,
      approve_url: optional_str(&fields, "approve_url").unwrap_or_default(),
    })
  }

  /// Captures an approved PayPal order.
  ///
  /// `hash = HMAC(secret, timestamp ‖ order_id ‖ paypal_order_id ‖ api_key)`.
  pub async fn capture_express_payment(
    &self,
    server: &ProxyServer,
    order_id: i64,
    paypal_order_id: &str,
  ) -> Result<CapturedPayment, ProxyError> {
    let timestamp = timestamp();
    let order_id_text = order_id.to_string();
    let hash = signing::sign(
      &server.api_secret,
      &[timestamp.as_str(), order_id_text.as_str(), paypal_order_id, server.api_key.as_str()],
    )?;

    let body = json!({
      "api_key": server.api_key,
      "order_id": order_id,
      "paypal_order_id": paypal_order_id,
      "timestamp": timestamp,
      "hash": hash,
    });
    let fields = self.post(server, CAPTURE_EXPRESS_PAYMENT, &body).await?;

    Ok(CapturedPayment {
      transaction_id: required_str(&fields, "transaction_id")?,
      seller_protection: optional_str(&fields, "seller_protection")
        .unwrap_or_else(|| UNKNOWN_SELLER_PROTECTION.to_string()),
    })
  }

  /// Fetches payer and shipping details of a PayPal order.
  ///
  /// `hash = HMAC(secret, timestamp ‖ paypal_order_id ‖ api_key)`.
  pub async fn get_paypal_order(
    &self,
    server: &ProxyServer,
    paypal_order_id: &str,
  ) -> Result<PayPalOrderDetails, ProxyError> {
    let timestamp = timestamp();
    let hash = signing::sign(&server.api_secret, &[timestamp.as_str(), paypal_order_id, server.api_key.as_str()])?;

    let body = json!({
      "api_key": server.api_key,
      "paypal_order_id": paypal_order_id,
      "timestamp": timestamp,
      "hash": hash,
    });
    let mut fields = self.post(server, GET_PAYPAL_ORDER, &body).await?;

    match fields.remove("order_details") {
      None | Some(Value::Null) => Err(ProxyError::NoOrderDetails),
      Some(details) => serde_json::from_value(details).map_err(|e| ProxyError::Malformed(e.to_string())),
    }
  }

  /// Pushes the finalized order to the proxy so both sides keep the same record.
  ///
  /// `hash = HMAC(secret, timestamp ‖ order_id ‖ transaction_id ‖ api_key)`.
  pub async fn mirror_order(&self, server: &ProxyServer, data: &MirrorOrderData) -> Result<(), ProxyError> {
    let timestamp = timestamp();
    let order_id = data.order_id.to_string();
    let hash = signing::sign(
      &server.api_secret,
      &[timestamp.as_str(), order_id.as_str(), data.transaction_id.as_str(), server.api_key.as_str()],
    )?;

    let body = json!({
      "api_key": server.api_key,
      "timestamp": timestamp,
      "hash": hash,
      "order_data": encode_order_data(data)?,
    });
    self.post(server, MIRROR_ORDER, &body).await.map(|_| ())
  }

  /// URL of the proxy-hosted page that renders the PayPal express buttons.
  ///
  /// `hash = HMAC(secret, timestamp ‖ api_key)`.
  pub fn express_button_url(&self, server: &ProxyServer, params: &ButtonFrameParams<'_>) -> Result<String, ProxyError> {
    let timestamp = timestamp();
    let hash = signing::sign(&server.api_secret, &[timestamp.as_str(), server.api_key.as_str()])?;
    let server_id = server.id.to_string();
    let needs_shipping = if params.needs_shipping { "1" } else { "0" };

    let url = Url::parse_with_params(
      &server.endpoint(EXPRESS_BUTTONS),
      &[
        ("api_key", server.api_key.as_str()),
        ("timestamp", timestamp.as_str()),
        ("hash", hash.as_str()),
        ("currency", params.currency),
        ("amount", params.amount),
        ("needs_shipping", needs_shipping),
        ("server_id", server_id.as_str()),
      ],
    )
    .map_err(|e| ProxyError::Malformed(format!("invalid proxy server URL: {}", e)))?;
    Ok(url.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn optional_fields_accept_numbers() {
    let fields = json!({ "transaction_id": 991, "empty": "" });
    let Value::Object(fields) = fields else { unreachable!() };
    assert_eq!(required_str(&fields, "transaction_id").unwrap(), "991");
    assert!(matches!(
      required_str(&fields, "empty"),
      Err(ProxyError::MissingField("empty"))
    ));
  }

  #[test]
  fn missing_field_message_names_the_field() {
    assert_eq!(
      ProxyError::MissingField("paypal_order_id").to_string(),
      "No PayPal order ID received from proxy server"
    );
    assert_eq!(ProxyError::MissingField("approve_url").to_string(), "No approve_url received from proxy server");
  }
}
