// src/models/order.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::address::{Address, AddressKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
  Pending,
  Processing,
  OnHold,
  Completed,
  Cancelled,
  Failed,
}

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::OnHold => "on-hold",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Failed => "failed",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
  pub product_id: i64,
  #[serde(default)]
  pub variation_id: Option<i64>,
  pub name: String,
  #[serde(default)]
  pub sku: String,
  #[serde(default)]
  pub short_description: String,
  pub quantity: u32,
  pub subtotal: Decimal,
  pub total: Decimal,
  #[serde(default)]
  pub subtotal_tax: Decimal,
  #[serde(default)]
  pub total_tax: Decimal,
  #[serde(default)]
  pub taxes: BTreeMap<String, Decimal>,
  /// Variation attributes with the storefront's `attribute_` prefix removed.
  #[serde(default)]
  pub meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeLine {
  pub name: String,
  #[serde(default)]
  pub tax_class: String,
  pub total: Decimal,
  #[serde(default)]
  pub total_tax: Decimal,
  #[serde(default)]
  pub taxes: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponLine {
  pub code: String,
  pub discount: Decimal,
  #[serde(default)]
  pub discount_tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingLine {
  pub method_title: String,
  pub method_id: String,
  pub instance_id: String,
  pub total: Decimal,
  #[serde(default)]
  pub taxes: BTreeMap<String, Decimal>,
  #[serde(default)]
  pub meta: BTreeMap<String, String>,
}

impl ShippingLine {
  /// `method_id:instance_id`, the form checkout totals name a shipping rate by.
  pub fn rate_key(&self) -> String {
    format!("{}:{}", self.method_id, self.instance_id)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
  pub rate_id: i64,
  pub label: String,
  #[serde(default)]
  pub compound: bool,
  pub tax_total: Decimal,
  pub shipping_tax_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderNote {
  pub content: String,
  pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub id: i64,
  pub order_key: String,
  pub status: OrderStatus,
  pub currency: String,
  #[serde(default)]
  pub payment_method: String,
  #[serde(default)]
  pub customer_id: Option<i64>,

  #[serde(default)]
  pub line_items: Vec<ProductLine>,
  #[serde(default)]
  pub fees: Vec<FeeLine>,
  #[serde(default)]
  pub coupons: Vec<CouponLine>,
  #[serde(default)]
  pub shipping_lines: Vec<ShippingLine>,
  #[serde(default)]
  pub tax_lines: Vec<TaxLine>,

  #[serde(default)]
  pub billing: Address,
  #[serde(default)]
  pub shipping: Address,

  #[serde(default)]
  pub discount_total: Decimal,
  #[serde(default)]
  pub total: Decimal,

  #[serde(default)]
  pub notes: Vec<OrderNote>,
  #[serde(default)]
  pub meta: BTreeMap<String, Value>,

  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// A fresh pending order with no lines. Stores call this once they have an id.
  pub fn new_pending(id: i64, order_key: String, currency: &str, customer_id: Option<i64>) -> Self {
    let now = Utc::now();
    Self {
      id,
      order_key,
      status: OrderStatus::Pending,
      currency: currency.to_string(),
      payment_method: String::new(),
      customer_id,
      line_items: Vec::new(),
      fees: Vec::new(),
      coupons: Vec::new(),
      shipping_lines: Vec::new(),
      tax_lines: Vec::new(),
      billing: Address::default(),
      shipping: Address::default(),
      discount_total: Decimal::ZERO,
      total: Decimal::ZERO,
      notes: Vec::new(),
      meta: BTreeMap::new(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn subtotal(&self) -> Decimal {
    self.line_items.iter().map(|l| l.subtotal).sum()
  }

  pub fn shipping_total(&self) -> Decimal {
    self.shipping_lines.iter().map(|l| l.total).sum()
  }

  pub fn total_tax(&self) -> Decimal {
    self.tax_lines.iter().map(|l| l.tax_total + l.shipping_tax_total).sum()
  }

  /// Pre-discount unit price of a line, rounded to cents.
  pub fn item_subtotal(line: &ProductLine) -> Decimal {
    if line.quantity == 0 {
      return Decimal::ZERO;
    }
    (line.subtotal / Decimal::from(line.quantity)).round_dp(2)
  }

  /// Rebuilds tax lines from line, fee and shipping taxes, then recomputes the
  /// discount and grand totals.
  pub fn calculate_totals(&mut self) {
    let mut item_taxes: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut shipping_taxes: BTreeMap<String, Decimal> = BTreeMap::new();

    let line_and_fee_taxes = self
      .line_items
      .iter()
      .flat_map(|l| l.taxes.iter())
      .chain(self.fees.iter().flat_map(|f| f.taxes.iter()));
    for (rate_id, amount) in line_and_fee_taxes {
      *item_taxes.entry(rate_id.clone()).or_default() += *amount;
    }
    for (rate_id, amount) in self.shipping_lines.iter().flat_map(|s| s.taxes.iter()) {
      *shipping_taxes.entry(rate_id.clone()).or_default() += *amount;
    }

    let mut rate_ids: Vec<&String> = item_taxes.keys().chain(shipping_taxes.keys()).collect();
    rate_ids.sort();
    rate_ids.dedup();

    self.tax_lines = rate_ids
      .into_iter()
      .map(|rate_id| TaxLine {
        rate_id: rate_id.parse().unwrap_or(0),
        label: "Tax".to_string(),
        compound: false,
        tax_total: item_taxes.get(rate_id).copied().unwrap_or_default().round_dp(2),
        shipping_tax_total: shipping_taxes.get(rate_id).copied().unwrap_or_default().round_dp(2),
      })
      .collect();

    self.discount_total = self.coupons.iter().map(|c| c.discount).sum();

    let lines: Decimal = self.line_items.iter().map(|l| l.total).sum();
    let fees: Decimal = self.fees.iter().map(|f| f.total).sum();
    self.total = (lines + fees + self.shipping_total() + self.total_tax()).round_dp(2);
  }

  pub fn meta(&self, key: &str) -> Option<&Value> {
    self.meta.get(key)
  }

  /// A metadata value as text; numbers are rendered, anything else is absent.
  pub fn meta_str(&self, key: &str) -> Option<String> {
    match self.meta.get(key)? {
      Value::String(s) if !s.is_empty() => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }

  pub fn meta_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self.meta.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
  }

  pub fn set_meta(&mut self, key: &str, value: impl Into<Value>) {
    self.meta.insert(key.to_string(), value.into());
  }

  /// Amounts are stored as strings so scale survives ("25.00" stays "25.00").
  pub fn set_meta_amount(&mut self, key: &str, amount: Decimal) {
    self.set_meta(key, amount.to_string());
  }

  pub fn address(&self, kind: AddressKind) -> &Address {
    match kind {
      AddressKind::Billing => &self.billing,
      AddressKind::Shipping => &self.shipping,
    }
  }

  /// Replaces the whole address record; no field of the old one survives.
  pub fn set_address(&mut self, kind: AddressKind, address: Address) {
    match kind {
      AddressKind::Billing => self.billing = address,
      AddressKind::Shipping => self.shipping = address,
    }
  }

  pub fn add_note(&mut self, content: impl Into<String>) {
    self.notes.push(OrderNote {
      content: content.into(),
      added_at: Utc::now(),
    });
  }

  /// Moves to `status`, recording the transition and `note` as an order note.
  pub fn update_status(&mut self, status: OrderStatus, note: &str) {
    let from = self.status;
    self.status = status;
    let transition = if from == status {
      format!("Order status set to {}.", status)
    } else {
      format!("Order status changed from {} to {}.", from, status)
    };
    if note.is_empty() {
      self.add_note(transition);
    } else {
      self.add_note(format!("{} {}", note, transition));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
  }

  fn product_line(subtotal: &str, qty: u32, tax: &str) -> ProductLine {
    ProductLine {
      product_id: 10,
      variation_id: None,
      name: "Mug".to_string(),
      sku: "MUG-1".to_string(),
      short_description: String::new(),
      quantity: qty,
      subtotal: dec(subtotal),
      total: dec(subtotal),
      subtotal_tax: dec(tax),
      total_tax: dec(tax),
      taxes: BTreeMap::from([("1".to_string(), dec(tax))]),
      meta: BTreeMap::new(),
    }
  }

  #[test]
  fn calculate_totals_groups_taxes_by_rate() {
    let mut order = Order::new_pending(1, "wc_order_x".to_string(), "USD", None);
    order.line_items.push(product_line("20.00", 2, "2.00"));
    order.shipping_lines.push(ShippingLine {
      method_title: "Flat rate".to_string(),
      method_id: "flat_rate".to_string(),
      instance_id: "3".to_string(),
      total: dec("5.00"),
      taxes: BTreeMap::from([("1".to_string(), dec("0.50"))]),
      meta: BTreeMap::new(),
    });
    order.coupons.push(CouponLine {
      code: "SAVE".to_string(),
      discount: dec("1.00"),
      discount_tax: Decimal::ZERO,
    });

    order.calculate_totals();

    assert_eq!(order.tax_lines.len(), 1);
    assert_eq!(order.tax_lines[0].rate_id, 1);
    assert_eq!(order.tax_lines[0].tax_total, dec("2.00"));
    assert_eq!(order.tax_lines[0].shipping_tax_total, dec("0.50"));
    assert_eq!(order.total_tax(), dec("2.50"));
    assert_eq!(order.discount_total, dec("1.00"));
    assert_eq!(order.total, dec("27.50"));
  }

  #[test]
  fn item_subtotal_is_rounded_unit_price() {
    assert_eq!(Order::item_subtotal(&product_line("10.00", 3, "0")), dec("3.33"));
    assert_eq!(Order::item_subtotal(&product_line("10.00", 0, "0")), Decimal::ZERO);
  }

  #[test]
  fn status_update_records_transition() {
    let mut order = Order::new_pending(1, "k".to_string(), "USD", None);
    order.update_status(OrderStatus::Processing, "Paid.");
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(
      order.notes.last().map(|n| n.content.as_str()),
      Some("Paid. Order status changed from pending to processing.")
    );
  }

  #[test]
  fn meta_amounts_keep_their_scale() {
    let mut order = Order::new_pending(1, "k".to_string(), "USD", None);
    order.set_meta_amount("_order_total", dec("25.00"));
    order.set_meta("_wpppc_server_id", 4);
    assert_eq!(order.meta_str("_order_total").as_deref(), Some("25.00"));
    assert_eq!(order.meta_str("_wpppc_server_id").as_deref(), Some("4"));
    assert_eq!(order.meta_as::<i64>("_wpppc_server_id"), Some(4));
  }
}
