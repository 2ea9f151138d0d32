// src/models/paypal.rs

//! The subset of a PayPal order the proxy relays back, and how it maps onto
//! storefront addresses.

use serde::{Deserialize, Serialize};

use crate::models::address::Address;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayPalOrderDetails {
  #[serde(default)]
  pub payer: Option<Payer>,
  #[serde(default)]
  pub purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payer {
  #[serde(default)]
  pub name: Option<PayerName>,
  #[serde(default)]
  pub email_address: Option<String>,
  #[serde(default)]
  pub address: Option<PayPalAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayerName {
  #[serde(default)]
  pub given_name: Option<String>,
  #[serde(default)]
  pub surname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseUnit {
  #[serde(default)]
  pub shipping: Option<ShippingDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingDetail {
  #[serde(default)]
  pub name: Option<ShippingName>,
  #[serde(default)]
  pub address: Option<PayPalAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingName {
  #[serde(default)]
  pub full_name: Option<String>,
  #[serde(default)]
  pub given_name: Option<String>,
  #[serde(default)]
  pub surname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayPalAddress {
  #[serde(default)]
  pub address_line_1: Option<String>,
  #[serde(default)]
  pub address_line_2: Option<String>,
  /// City.
  #[serde(default)]
  pub admin_area_2: Option<String>,
  /// State or province.
  #[serde(default)]
  pub admin_area_1: Option<String>,
  #[serde(default)]
  pub postal_code: Option<String>,
  #[serde(default)]
  pub country_code: Option<String>,
}

fn text(value: &Option<String>) -> String {
  value.as_deref().unwrap_or_default().to_string()
}

impl PayPalAddress {
  fn fill(&self, address: &mut Address) {
    address.address_1 = text(&self.address_line_1);
    address.address_2 = text(&self.address_line_2);
    address.city = text(&self.admin_area_2);
    address.state = text(&self.admin_area_1);
    address.postcode = text(&self.postal_code);
    address.country = text(&self.country_code);
  }
}

impl PayPalOrderDetails {
  /// Billing address built from the payer, if PayPal sent one.
  pub fn billing_address(&self) -> Option<Address> {
    let payer = self.payer.as_ref()?;
    let mut address = Address::default();
    if let Some(name) = &payer.name {
      address.first_name = text(&name.given_name);
      address.last_name = text(&name.surname);
    }
    address.email = text(&payer.email_address);
    if let Some(paypal_address) = &payer.address {
      paypal_address.fill(&mut address);
    }
    Some(address)
  }

  /// Shipping address from the first purchase unit whose shipping block has a
  /// name or an address. Empty blocks are passed over.
  ///
  /// A `full_name` is split on its first space; without one the given name
  /// and surname are used.
  pub fn shipping_address(&self) -> Option<Address> {
    let shipping = self
      .purchase_units
      .iter()
      .filter_map(|unit| unit.shipping.as_ref())
      .find(|shipping| shipping.name.is_some() || shipping.address.is_some())?;
    let mut address = Address::default();

    if let Some(name) = &shipping.name {
      match name.full_name.as_deref().filter(|n| !n.is_empty()) {
        Some(full_name) => {
          let (first, last) = full_name.split_once(' ').unwrap_or((full_name, ""));
          address.first_name = first.to_string();
          address.last_name = last.to_string();
        }
        None => {
          address.first_name = text(&name.given_name);
          address.last_name = text(&name.surname);
        }
      }
    }
    if let Some(paypal_address) = &shipping.address {
      paypal_address.fill(&mut address);
    }
    Some(address)
  }
}
