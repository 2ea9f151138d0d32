// src/models/cart.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::models::order::Order;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub sku: String,
  #[serde(default)]
  pub short_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
  pub product: ProductSummary,
  #[serde(default)]
  pub variation_id: Option<i64>,
  /// Variation attributes keyed the way the storefront posts them, e.g. `attribute_pa_color`.
  #[serde(default)]
  pub variation: BTreeMap<String, String>,
  pub quantity: u32,
  pub line_subtotal: Decimal,
  pub line_total: Decimal,
  #[serde(default)]
  pub line_subtotal_tax: Decimal,
  #[serde(default)]
  pub line_tax: Decimal,
  /// Tax per rate id.
  #[serde(default)]
  pub line_tax_data: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartFee {
  pub name: String,
  #[serde(default)]
  pub tax_class: String,
  pub amount: Decimal,
  #[serde(default)]
  pub tax: Decimal,
  #[serde(default)]
  pub tax_data: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartCoupon {
  pub code: String,
  pub discount: Decimal,
  #[serde(default)]
  pub discount_tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
  /// `method_id:instance_id`, e.g. `flat_rate:3`.
  pub id: String,
  pub method_id: String,
  pub instance_id: String,
  pub label: String,
  pub cost: Decimal,
  #[serde(default)]
  pub taxes: BTreeMap<String, Decimal>,
  #[serde(default)]
  pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingPackage {
  #[serde(default)]
  pub rates: Vec<ShippingRate>,
}

/// Identity of a logged-in shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub id: i64,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
}

/// Read-only view of a session's cart at the moment a flow starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSnapshot {
  pub items: Vec<CartItem>,
  pub fees: Vec<CartFee>,
  pub coupons: Vec<CartCoupon>,
  pub shipping_packages: Vec<ShippingPackage>,
  pub currency: String,
  pub needs_shipping: bool,
  pub total: Decimal,
  pub customer: Option<Customer>,
}

impl CartSnapshot {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Every package's rate with the `method:instance` id `rate_id`, in package order.
  pub fn shipping_rates<'s, 'r>(&'s self, rate_id: &'r str) -> impl Iterator<Item = &'s ShippingRate> + use<'s, 'r> {
    self
      .shipping_packages
      .iter()
      .flat_map(|package| package.rates.iter())
      .filter(move |rate| rate.id == rate_id)
  }

  /// Looks up a shipping rate by its `method:instance` id across every package.
  pub fn find_shipping_rate(&self, rate_id: &str) -> Option<&ShippingRate> {
    self.shipping_rates(rate_id).next()
  }
}

/// Totals the shopper's browser displayed when they pressed the express button.
///
/// Every amount is optional; anything missing falls back to the order's own figure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutTotals {
  #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
  pub subtotal: Option<Decimal>,
  #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
  pub shipping: Option<Decimal>,
  #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
  pub tax: Option<Decimal>,
  #[serde(default, deserialize_with = "lenient_decimal", skip_serializing_if = "Option::is_none")]
  pub total: Option<Decimal>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shipping_method: Option<String>,
}

/// Checkout totals with every gap filled from the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTotals {
  pub subtotal: Decimal,
  pub shipping: Decimal,
  pub tax: Decimal,
  pub total: Decimal,
}

impl CheckoutTotals {
  pub fn is_empty(&self) -> bool {
    *self == CheckoutTotals::default()
  }

  pub fn shipping_method(&self) -> Option<&str> {
    self.shipping_method.as_deref().filter(|m| !m.is_empty())
  }

  pub fn resolve(&self, order: &Order) -> ResolvedTotals {
    ResolvedTotals {
      subtotal: self.subtotal.unwrap_or_else(|| order.subtotal()),
      shipping: self.shipping.unwrap_or_else(|| order.shipping_total()),
      tax: self.tax.unwrap_or_else(|| order.total_tax()),
      total: self.total.unwrap_or(order.total),
    }
  }
}

/// Accepts a JSON number, a numeric string, an empty string or null.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
  D: Deserializer<'de>,
{
  use serde::de::Error;

  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::Null => Ok(None),
    serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
    serde_json::Value::String(s) => s.trim().parse::<Decimal>().map(Some).map_err(D::Error::custom),
    serde_json::Value::Number(n) => n.to_string().parse::<Decimal>().map(Some).map_err(D::Error::custom),
    other => Err(D::Error::custom(format!("expected a decimal amount, got {}", other))),
  }
}
