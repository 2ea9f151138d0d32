// src/pipelines/reconcile.rs

//! Keeps an express order on the amounts the shopper approved.
//!
//! The order's own arithmetic may drift from what the browser showed (tax
//! rounding, rates changing between create and complete). The submitted
//! snapshot always wins and every overwrite is logged.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::cart::ResolvedTotals;
use crate::models::{meta, CartSnapshot, CheckoutTotals, Order, ShippingLine, ShippingRate, TaxLine};

fn note_divergence(order_id: i64, what: &str, computed: Decimal, submitted: Decimal) {
  if computed != submitted {
    warn!(
      order_id,
      amount = what,
      %computed,
      %submitted,
      "Submitted checkout amount differs from the recomputed order; keeping the submitted value."
    );
  }
}

/// Overwrites total, shipping and tax metadata (and the order total) with each
/// value present in `totals`. Absent values leave the recomputed figures alone.
pub fn lock_submitted_totals(order: &mut Order, totals: &CheckoutTotals) {
  if let Some(total) = totals.total {
    note_divergence(order.id, "total", order.total, total);
    order.set_meta_amount(meta::ORDER_TOTAL, total);
    order.total = total;
  }
  if let Some(shipping) = totals.shipping {
    note_divergence(order.id, "shipping", order.shipping_total(), shipping);
    order.set_meta_amount(meta::ORDER_SHIPPING, shipping);
  }
  if let Some(tax) = totals.tax {
    note_divergence(order.id, "tax", order.total_tax(), tax);
    order.set_meta_amount(meta::ORDER_TAX, tax);
  }
}

/// A shipping line charging `amount` for a cart rate, without taxes.
pub fn shipping_line_from_rate(rate: &ShippingRate, amount: Decimal) -> ShippingLine {
  ShippingLine {
    method_title: rate.label.clone(),
    method_id: rate.method_id.clone(),
    instance_id: rate.instance_id.clone(),
    total: amount,
    taxes: BTreeMap::new(),
    meta: rate.meta.clone(),
  }
}

/// A shipping line for `rate_key` ("method_id:instance_id"), taken from the
/// cart's rate when it still exists.
pub fn shipping_line_for(rate_key: &str, cart: Option<&CartSnapshot>, amount: Decimal) -> ShippingLine {
  if let Some(rate) = cart.and_then(|c| c.find_shipping_rate(rate_key)) {
    return shipping_line_from_rate(rate, amount);
  }
  let (method_id, instance_id) = rate_key.split_once(':').unwrap_or((rate_key, ""));
  ShippingLine {
    method_title: method_id.to_string(),
    method_id: method_id.to_string(),
    instance_id: instance_id.to_string(),
    total: amount,
    taxes: BTreeMap::new(),
    meta: BTreeMap::new(),
  }
}

/// Leaves exactly one shipping line, the one matching `rate_key`, charging `amount`.
pub fn reassert_shipping(order: &mut Order, rate_key: &str, amount: Decimal, cart: Option<&CartSnapshot>) {
  let existing = order.shipping_lines.iter().position(|line| line.rate_key() == rate_key);
  let mut line = match existing {
    Some(index) => order.shipping_lines.swap_remove(index),
    None => {
      debug!(order_id = order.id, %rate_key, "Shipping line missing; rebuilding it.");
      shipping_line_for(rate_key, cart, amount)
    }
  };
  line.total = amount;
  line.taxes.clear();

  if !order.shipping_lines.is_empty() {
    debug!(
      order_id = order.id,
      dropped = order.shipping_lines.len(),
      "Dropping shipping lines that were not chosen."
    );
  }
  order.shipping_lines = vec![line];
}

/// The first tax line carries the whole `tax`, later lines carry nothing and
/// no line carries shipping tax.
pub fn reassert_taxes(order: &mut Order, tax: Decimal) {
  if order.tax_lines.is_empty() {
    if tax > Decimal::ZERO {
      order.tax_lines.push(TaxLine {
        rate_id: 0,
        label: "Tax".to_string(),
        compound: false,
        tax_total: tax,
        shipping_tax_total: Decimal::ZERO,
      });
    }
    return;
  }

  let mut assigned = Decimal::ZERO;
  for line in &mut order.tax_lines {
    line.tax_total = tax - assigned;
    line.shipping_tax_total = Decimal::ZERO;
    assigned += line.tax_total;
  }
}

/// Puts a stored snapshot back on the order before capture and returns the
/// amounts the order now carries.
pub fn restore_snapshot(order: &mut Order, totals: &CheckoutTotals, cart: Option<&CartSnapshot>) -> ResolvedTotals {
  let resolved = totals.resolve(order);

  if let Some(rate_key) = totals.shipping_method() {
    reassert_shipping(order, rate_key, resolved.shipping, cart);
  }

  order.set_meta_amount(meta::ORDER_TOTAL, resolved.total);
  order.set_meta_amount(meta::ORDER_SHIPPING, resolved.shipping);
  order.set_meta_amount(meta::ORDER_TAX, resolved.tax);
  order.set_meta_amount(meta::CART_TAX, resolved.tax);

  reassert_taxes(order, resolved.tax);
  order.total = resolved.total;
  resolved
}
