// src/pipelines/complete_order_pipeline.rs

//! Complete-order flow: puts the approved amounts back on the order, captures
//! the PayPal payment through the pinned proxy and finalizes the order.
//!
//! Capture and local finalization are not one transaction. A failure after a
//! successful capture leaves a paid PayPal order with a pending local order.

use checkout_flow::{ContextData, Pipeline, PipelineControl, SkipCondition};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::models::payloads::MirrorOrderData;
use crate::models::{meta, CheckoutTotals, OrderStatus};
use crate::pipelines::common_steps::{self, loaded_order};
use crate::pipelines::contexts::CompleteOrderCtxData;
use crate::pipelines::create_order_pipeline::paypal_line_items;
use crate::pipelines::reconcile;

const PAID_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn build() -> Pipeline<CompleteOrderCtxData, AppError> {
  let no_snapshot: SkipCondition<CompleteOrderCtxData> = Arc::new(|ctx: &CompleteOrderCtxData| ctx.totals.is_none());

  let mut p = Pipeline::<CompleteOrderCtxData, AppError>::new(
    "complete_express_order",
    &[
      ("load_order", false, None),
      ("restore_checkout_totals", false, Some(no_snapshot)),
      ("resolve_server", false, None),
      ("capture_payment", false, None),
      ("finalize_order", false, None),
      ("record_server_usage", false, None),
      ("mirror_order", true, None),
      ("empty_cart", false, None),
    ],
  );

  p.on("load_order", common_steps::load_order);
  p.after("load_order", read_stored_totals);
  p.on("restore_checkout_totals", restore_checkout_totals);
  p.on("resolve_server", common_steps::resolve_pinned_server);
  p.on("capture_payment", capture_payment);
  p.on("finalize_order", finalize_order);
  p.on("record_server_usage", record_server_usage);
  p.on("mirror_order", mirror_order);
  p.on("empty_cart", empty_cart);
  p
}

async fn read_stored_totals(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let totals = order
    .meta_as::<CheckoutTotals>(meta::EXPRESS_TOTALS)
    .filter(|totals| !totals.is_empty());
  debug!(order_id = order.id, has_snapshot = totals.is_some(), "Stored checkout totals read.");
  ctx_data.write().totals = totals;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "complete_order::restore_checkout_totals", skip(ctx_data), err(Display))]
async fn restore_checkout_totals(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let mut order = loaded_order(&ctx_data)?;
  let (state, session_id, totals) = {
    let guard = ctx_data.read();
    let totals = guard
      .totals
      .clone()
      .ok_or_else(|| AppError::Internal("checkout totals were not read".to_string()))?;
    (guard.app_state.clone(), guard.session_id.clone(), totals)
  };

  let cart = state.carts.load_cart(&session_id).await?;
  let cart = (!cart.is_empty()).then_some(cart);

  let resolved = reconcile::restore_snapshot(&mut order, &totals, cart.as_ref());
  state.orders.save_order(&order).await?;
  info!(
    order_id = order.id,
    shipping = %resolved.shipping,
    tax = %resolved.tax,
    total = %resolved.total,
    "Checkout totals restored on order."
  );

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "complete_order::capture_payment", skip(ctx_data), err(Display))]
async fn capture_payment(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let (state, server, order_id, paypal_order_id) = {
    let guard = ctx_data.read();
    let server = guard
      .server
      .clone()
      .ok_or_else(|| AppError::Internal("proxy server was not resolved".to_string()))?;
    (guard.app_state.clone(), server, guard.order_id, guard.paypal_order_id.clone())
  };

  info!(order_id, %paypal_order_id, server_id = server.id, "Capturing express payment.");
  let payment = state
    .proxy
    .capture_express_payment(&server, order_id, &paypal_order_id)
    .await?;
  info!(order_id, transaction_id = %payment.transaction_id, "Express payment captured.");

  ctx_data.write().payment = Some(payment);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "complete_order::finalize_order", skip(ctx_data), err(Display))]
async fn finalize_order(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let mut order = loaded_order(&ctx_data)?;
  let (orders, payment, paypal_order_id, has_snapshot) = {
    let guard = ctx_data.read();
    let payment = guard
      .payment
      .clone()
      .ok_or_else(|| AppError::Internal("payment was not captured".to_string()))?;
    (
      guard.app_state.orders.clone(),
      payment,
      guard.paypal_order_id.clone(),
      guard.totals.is_some(),
    )
  };

  order.set_meta(meta::PAID_DATE, Utc::now().format(PAID_DATE_FORMAT).to_string());
  order.set_meta(meta::TRANSACTION_ID, payment.transaction_id.as_str());
  order.update_status(
    OrderStatus::Processing,
    &format!(
      "Payment completed via PayPal Express Checkout. Transaction ID: {}, PayPal Order ID: {}",
      payment.transaction_id, paypal_order_id
    ),
  );
  if has_snapshot {
    order.add_note(format!(
      "Express Checkout Completed. Shipping: {:.2} {currency}, Tax: {:.2} {currency}, Total: {:.2} {currency}",
      order.shipping_total(),
      order.total_tax(),
      order.total,
      currency = order.currency
    ));
  }
  order.set_meta(meta::PAYPAL_TRANSACTION_ID, payment.transaction_id.as_str());
  order.set_meta(meta::PAYPAL_SELLER_PROTECTION, payment.seller_protection.as_str());

  orders.save_order(&order).await?;
  info!(order_id = order.id, status = %order.status, "Express order finalized.");

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn record_server_usage(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let (servers, server_id) = {
    let guard = ctx_data.read();
    (guard.app_state.servers.clone(), guard.server.as_ref().map(|s| s.id))
  };
  let server_id = server_id.ok_or_else(|| AppError::Internal("proxy server was not resolved".to_string()))?;

  servers.add_server_usage(server_id, order.total).await?;
  debug!(server_id, amount = %order.total, "Server usage recorded.");
  Ok(PipelineControl::Continue)
}

/// Best effort: the payment is already captured, so a failed mirror is only logged.
#[instrument(name = "complete_order::mirror_order", skip(ctx_data))]
async fn mirror_order(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let (state, server, paypal_order_id, transaction_id) = {
    let guard = ctx_data.read();
    (
      guard.app_state.clone(),
      guard.server.clone(),
      guard.paypal_order_id.clone(),
      guard.payment.as_ref().map(|p| p.transaction_id.clone()).unwrap_or_default(),
    )
  };
  let Some(server) = server else {
    return Ok(PipelineControl::Continue);
  };

  let data = MirrorOrderData {
    order_id: order.id,
    order_key: order.order_key.clone(),
    status: order.status.as_str().to_string(),
    currency: order.currency.clone(),
    order_total: order.total,
    shipping_total: order.shipping_total(),
    tax_total: order.total_tax(),
    paypal_order_id,
    transaction_id,
    billing: order.billing.clone(),
    shipping: order.shipping.clone(),
    line_items: paypal_line_items(&order),
  };

  match state.proxy.mirror_order(&server, &data).await {
    Ok(()) => debug!(order_id = order.id, "Order mirrored to proxy server."),
    Err(e) => warn!(order_id = order.id, error = %e, "Mirroring order to proxy server failed."),
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "complete_order::empty_cart", skip(ctx_data), err(Display))]
async fn empty_cart(ctx_data: ContextData<CompleteOrderCtxData>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let (state, session_id) = {
    let guard = ctx_data.read();
    (guard.app_state.clone(), guard.session_id.clone())
  };

  state.carts.empty_cart(&session_id).await?;
  ctx_data.write().redirect = Some(state.config.order_received_url(&order));
  Ok(PipelineControl::Continue)
}
