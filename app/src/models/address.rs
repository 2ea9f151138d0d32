// src/models/address.rs
use serde::{Deserialize, Serialize};

use crate::models::meta;

/// A postal address as the storefront stores it on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
  pub first_name: String,
  pub last_name: String,
  pub company: String,
  pub email: String,
  pub phone: String,
  pub address_1: String,
  pub address_2: String,
  pub city: String,
  pub state: String,
  pub postcode: String,
  pub country: String,
}

impl Address {
  pub fn is_empty(&self) -> bool {
    *self == Address::default()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
  Billing,
  Shipping,
}

impl AddressKind {
  /// Metadata key holding the raw address last received from PayPal.
  pub fn meta_key(self) -> &'static str {
    match self {
      AddressKind::Billing => meta::BILLING_ADDRESS,
      AddressKind::Shipping => meta::SHIPPING_ADDRESS,
    }
  }
}
