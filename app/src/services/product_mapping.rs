// src/services/product_mapping.rs

//! Optional translation of storefront product ids to the ids a proxy server knows.

use serde::Deserialize;
use std::collections::HashMap;

use crate::models::payloads::PayPalLineItem;

pub trait ProductMapper: Send + Sync {
  /// Rewrites `items` for the proxy server `server_id`. Unmapped items pass through untouched.
  fn map_line_items(&self, items: Vec<PayPalLineItem>, server_id: i64) -> Vec<PayPalLineItem>;
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
  server_id: i64,
  product_id: i64,
  mapped_product_id: String,
}

/// Static mapping table, loaded from `PRODUCT_MAPPINGS`:
/// `[{"server_id": 1, "product_id": 42, "mapped_product_id": "B-17"}]`.
#[derive(Debug, Default, Clone)]
pub struct MappingTable {
  entries: HashMap<(i64, i64), String>,
}

impl MappingTable {
  pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
    let rows: Vec<MappingEntry> = serde_json::from_str(raw)?;
    let entries = rows
      .into_iter()
      .map(|row| ((row.server_id, row.product_id), row.mapped_product_id))
      .collect();
    Ok(Self { entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl ProductMapper for MappingTable {
  fn map_line_items(&self, items: Vec<PayPalLineItem>, server_id: i64) -> Vec<PayPalLineItem> {
    items
      .into_iter()
      .map(|mut item| {
        if let Some(mapped) = self.entries.get(&(server_id, item.product_id)) {
          item.mapped_product_id = Some(mapped.clone());
        }
        item
      })
      .collect()
  }
}
