// src/models/payloads.rs

//! Order data shipped to the proxy server inside signed requests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::address::Address;

/// Words kept from a product's short description.
pub const DESCRIPTION_WORDS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayPalLineItem {
  pub name: String,
  pub quantity: u32,
  pub unit_price: Decimal,
  pub tax_amount: Decimal,
  pub sku: String,
  pub product_id: i64,
  pub description: String,
  /// Product id on the proxy side, when a mapping exists for the pinned server.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mapped_product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressOrderData {
  pub order_id: i64,
  pub order_key: String,
  pub line_items: Vec<PayPalLineItem>,
  pub cart_total: Decimal,
  pub order_total: Decimal,
  pub tax_total: Decimal,
  pub shipping_total: Decimal,
  pub discount_total: Decimal,
  pub currency: String,
  pub return_url: String,
  pub cancel_url: String,
  pub callback_url: String,
  pub needs_shipping: bool,
  pub server_id: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_info: Option<CustomerInfo>,
}

/// Snapshot of a paid order pushed to the proxy after capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorOrderData {
  pub order_id: i64,
  pub order_key: String,
  pub status: String,
  pub currency: String,
  pub order_total: Decimal,
  pub shipping_total: Decimal,
  pub tax_total: Decimal,
  pub paypal_order_id: String,
  pub transaction_id: String,
  pub billing: Address,
  pub shipping: Address,
  pub line_items: Vec<PayPalLineItem>,
}

/// `base64(json(data))`, the envelope format the proxy expects for `order_data`.
pub fn encode_order_data<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
  Ok(STANDARD.encode(serde_json::to_vec(data)?))
}

/// Keeps the first `max_words` whitespace-separated words, appending an
/// ellipsis when anything was cut. Markup is stripped first.
pub fn trim_words(text: &str, max_words: usize) -> String {
  let plain = strip_tags(text);
  let words: Vec<&str> = plain.split_whitespace().collect();
  if words.len() <= max_words {
    return words.join(" ");
  }
  format!("{}…", words[..max_words].join(" "))
}

fn strip_tags(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut in_tag = false;
  for ch in text.chars() {
    match ch {
      '<' => in_tag = true,
      '>' if in_tag => {
        in_tag = false;
        out.push(' ');
      }
      _ if !in_tag => out.push(ch),
      _ => {}
    }
  }
  out
}
