// src/pipelines/address_pipeline.rs

//! Address backfill flow: copies the payer and shipping addresses PayPal
//! collected onto the local order. Running it again simply overwrites.

use checkout_flow::{ContextData, Pipeline, PipelineControl};
use tracing::{debug, info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::models::paypal::PayPalOrderDetails;
use crate::models::{Address, AddressKind, Order};
use crate::pipelines::common_steps::{self, loaded_order};
use crate::pipelines::contexts::FetchDetailsCtxData;

pub const DETAILS_UPDATED_MESSAGE: &str = "Order details retrieved and addresses updated";

pub fn build() -> Pipeline<FetchDetailsCtxData, AppError> {
  let mut p = Pipeline::<FetchDetailsCtxData, AppError>::new(
    "fetch_paypal_order_details",
    &[
      ("load_order", false, None),
      ("resolve_server", false, None),
      ("fetch_paypal_order", false, None),
      ("apply_addresses", false, None),
      ("save_order", false, None),
    ],
  );

  p.on("load_order", common_steps::load_order);
  p.on("resolve_server", common_steps::resolve_pinned_server);
  p.on("fetch_paypal_order", fetch_paypal_order);
  p.on("apply_addresses", apply_addresses);
  p.on("save_order", common_steps::save_order);
  p
}

fn apply(order: &mut Order, kind: AddressKind, address: Address) {
  match serde_json::to_value(&address) {
    Ok(raw) => order.set_meta(kind.meta_key(), raw),
    Err(e) => debug!(error = %e, "Raw address could not be mirrored into metadata."),
  }
  order.set_address(kind, address);
}

/// Applies whichever addresses in `details` are usable and reports which were.
///
/// Billing needs a first name; shipping needs a first name and a first address line.
pub fn apply_paypal_addresses(order: &mut Order, details: &PayPalOrderDetails) -> (bool, bool) {
  let billing = details.billing_address().filter(|a| !a.first_name.is_empty());
  let shipping = details
    .shipping_address()
    .filter(|a| !a.first_name.is_empty() && !a.address_1.is_empty());

  let has_billing = billing.is_some();
  let has_shipping = shipping.is_some();
  if let Some(address) = billing {
    apply(order, AddressKind::Billing, address);
  }
  if let Some(address) = shipping {
    apply(order, AddressKind::Shipping, address);
  }
  (has_billing, has_shipping)
}

#[instrument(name = "fetch_details::fetch_paypal_order", skip(ctx_data), err(Display))]
async fn fetch_paypal_order(ctx_data: ContextData<FetchDetailsCtxData>) -> AppResult<PipelineControl> {
  let (state, server, paypal_order_id) = {
    let guard = ctx_data.read();
    let server = guard
      .server
      .clone()
      .ok_or_else(|| AppError::Internal("proxy server was not resolved".to_string()))?;
    (guard.app_state.clone(), server, guard.paypal_order_id.clone())
  };

  let details = state.proxy.get_paypal_order(&server, &paypal_order_id).await?;
  debug!(%paypal_order_id, units = details.purchase_units.len(), "PayPal order details received.");

  ctx_data.write().details = Some(details);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "fetch_details::apply_addresses", skip(ctx_data), err(Display))]
async fn apply_addresses(ctx_data: ContextData<FetchDetailsCtxData>) -> AppResult<PipelineControl> {
  let mut order = loaded_order(&ctx_data)?;
  let mut guard = ctx_data.write();
  let details = guard
    .details
    .take()
    .ok_or_else(|| AppError::Internal("PayPal order details were not fetched".to_string()))?;

  let (has_billing, has_shipping) = apply_paypal_addresses(&mut order, &details);
  info!(order_id = order.id, has_billing, has_shipping, "Addresses from PayPal applied.");

  guard.has_billing = has_billing;
  guard.has_shipping = has_shipping;
  guard.details = Some(details);
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}
