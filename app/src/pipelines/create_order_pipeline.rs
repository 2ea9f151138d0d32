// src/pipelines/create_order_pipeline.rs

//! Create-order flow: turns the session's cart into a pending express order
//! and asks the pinned proxy server to open a PayPal order for it.

use checkout_flow::{ContextData, Pipeline, PipelineControl};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::models::payloads::{trim_words, CustomerInfo, ExpressOrderData, PayPalLineItem, DESCRIPTION_WORDS};
use crate::models::{
  meta, Address, AddressKind, CartSnapshot, CheckoutTotals, CouponLine, FeeLine, Order, OrderStatus, ProductLine,
  ShippingLine,
};
use crate::pipelines::common_steps::loaded_order;
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::pipelines::reconcile;

pub fn build() -> Pipeline<CreateOrderCtxData, AppError> {
  let mut p = Pipeline::<CreateOrderCtxData, AppError>::new(
    "create_express_order",
    &[
      ("load_cart", false, None),
      ("create_provisional_order", false, None),
      ("pin_proxy_server", false, None),
      ("build_line_items", false, None),
      ("request_paypal_order", false, None),
      ("store_paypal_order_id", false, None),
    ],
  );

  p.on("load_cart", load_cart);
  p.on("create_provisional_order", create_provisional_order);
  p.on("pin_proxy_server", pin_proxy_server);
  p.on("build_line_items", build_line_items);
  p.on("request_paypal_order", request_paypal_order);
  p.on("store_paypal_order_id", store_paypal_order_id);
  p
}

/// Variation attributes are stored without their `attribute_` prefix.
fn variation_meta(variation: &BTreeMap<String, String>) -> BTreeMap<String, String> {
  variation
    .iter()
    .map(|(name, value)| (name.replace("attribute_", ""), value.clone()))
    .collect()
}

/// Copies every cart line, fee, coupon and the chosen shipping rate onto `order`.
pub(crate) fn copy_cart_into_order(order: &mut Order, cart: &CartSnapshot, totals: &CheckoutTotals) {
  order.line_items = cart
    .items
    .iter()
    .map(|item| ProductLine {
      product_id: item.product.id,
      variation_id: item.variation_id,
      name: item.product.name.clone(),
      sku: item.product.sku.clone(),
      short_description: item.product.short_description.clone(),
      quantity: item.quantity,
      subtotal: item.line_subtotal,
      total: item.line_total,
      subtotal_tax: item.line_subtotal_tax,
      total_tax: item.line_tax,
      taxes: item.line_tax_data.clone(),
      meta: variation_meta(&item.variation),
    })
    .collect();

  order.fees = cart
    .fees
    .iter()
    .map(|fee| FeeLine {
      name: fee.name.clone(),
      tax_class: fee.tax_class.clone(),
      total: fee.amount,
      total_tax: fee.tax,
      taxes: fee.tax_data.clone(),
    })
    .collect();

  order.coupons = cart
    .coupons
    .iter()
    .map(|coupon| CouponLine {
      code: coupon.code.clone(),
      discount: coupon.discount,
      discount_tax: coupon.discount_tax,
    })
    .collect();

  order.payment_method = meta::PAYMENT_METHOD.to_string();

  if let Some(rate_key) = totals.shipping_method() {
    order.shipping_lines = cart
      .shipping_rates(rate_key)
      .map(|rate| ShippingLine {
        taxes: rate.taxes.clone(),
        ..reconcile::shipping_line_from_rate(rate, rate.cost)
      })
      .collect();
    if order.shipping_lines.is_empty() {
      warn!(order_id = order.id, %rate_key, "Chosen shipping rate is not in the cart.");
    }
  }

  order.set_address(AddressKind::Billing, Address::default());
  order.set_address(AddressKind::Shipping, Address::default());
}

/// Line items as the proxy expects them, one per product line.
pub(crate) fn paypal_line_items(order: &Order) -> Vec<PayPalLineItem> {
  order
    .line_items
    .iter()
    .map(|line| PayPalLineItem {
      name: line.name.clone(),
      quantity: line.quantity,
      unit_price: Order::item_subtotal(line),
      tax_amount: line.total_tax,
      sku: line.sku.clone(),
      product_id: line.product_id,
      description: trim_words(&line.short_description, DESCRIPTION_WORDS),
      mapped_product_id: None,
    })
    .collect()
}

#[instrument(name = "create_order::load_cart", skip(ctx_data), err(Display))]
async fn load_cart(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (carts, session_id) = {
    let guard = ctx_data.read();
    (guard.app_state.carts.clone(), guard.session_id.clone())
  };

  let cart = carts.load_cart(&session_id).await?;
  if cart.is_empty() {
    info!("Express checkout requested with an empty cart.");
    return Err(AppError::EmptyCart);
  }
  debug!(items = cart.items.len(), currency = %cart.currency, "Cart loaded.");

  ctx_data.write().cart = Some(cart);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::create_provisional_order", skip(ctx_data), err(Display))]
async fn create_provisional_order(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let (orders, cart, totals) = {
    let guard = ctx_data.read();
    let cart = guard
      .cart
      .clone()
      .ok_or_else(|| AppError::Internal("cart was not loaded before order creation".to_string()))?;
    (guard.app_state.orders.clone(), cart, guard.totals.clone())
  };

  let customer_id = cart.customer.as_ref().map(|c| c.id);
  let mut order = orders.create_order(&cart.currency, customer_id).await?;

  order.set_meta(meta::EXPRESS_CHECKOUT, "yes");
  if !totals.is_empty() {
    order.set_meta(meta::EXPRESS_TOTALS, serde_json::to_value(&totals)?);
  }

  copy_cart_into_order(&mut order, &cart, &totals);
  order.calculate_totals();
  reconcile::lock_submitted_totals(&mut order, &totals);
  order.update_status(OrderStatus::Pending, "Order created via PayPal Express Checkout");

  orders.save_order(&order).await?;
  info!(order_id = order.id, total = %order.total, "Provisional express order created.");

  let mut guard = ctx_data.write();
  guard.order_id = order.id;
  guard.order = Some(order);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::pin_proxy_server", skip(ctx_data), err(Display))]
async fn pin_proxy_server(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let mut order = loaded_order(&ctx_data)?;
  let (servers, orders) = {
    let guard = ctx_data.read();
    (guard.app_state.servers.clone(), guard.app_state.orders.clone())
  };

  let Some(server) = servers.resolve_server().await? else {
    warn!(order_id = order.id, "No proxy server available; order stays pending.");
    return Err(AppError::NoServer);
  };

  order.set_meta(meta::SERVER_ID, server.id);
  orders.save_order(&order).await?;
  debug!(order_id = order.id, server_id = server.id, "Proxy server pinned.");

  let mut guard = ctx_data.write();
  guard.order = Some(order);
  guard.server = Some(server);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::build_line_items", skip(ctx_data), err(Display))]
async fn build_line_items(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let mut guard = ctx_data.write();
  let server_id = guard
    .server
    .as_ref()
    .map(|s| s.id)
    .ok_or_else(|| AppError::Internal("proxy server was not pinned".to_string()))?;

  let mut items = paypal_line_items(&order);
  if let Some(mapper) = &guard.app_state.product_mapper {
    items = mapper.map_line_items(items, server_id);
    debug!(order_id = order.id, server_id, "Product mapping applied to line items.");
  }
  guard.line_items = items;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::request_paypal_order", skip(ctx_data), err(Display))]
async fn request_paypal_order(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let (state, server, data) = {
    let guard = ctx_data.read();
    let server = guard
      .server
      .clone()
      .ok_or_else(|| AppError::Internal("proxy server was not pinned".to_string()))?;
    let cart = guard
      .cart
      .as_ref()
      .ok_or_else(|| AppError::Internal("cart was not loaded".to_string()))?;
    let config = &guard.app_state.config;
    let resolved = guard.totals.resolve(&order);

    let data = ExpressOrderData {
      order_id: order.id,
      order_key: order.order_key.clone(),
      line_items: guard.line_items.clone(),
      cart_total: resolved.subtotal,
      order_total: resolved.total,
      tax_total: resolved.tax,
      shipping_total: resolved.shipping,
      discount_total: order.discount_total,
      currency: order.currency.clone(),
      return_url: config.checkout_url(),
      cancel_url: config.cart_url(),
      callback_url: config.shipping_callback_url(),
      needs_shipping: cart.needs_shipping,
      server_id: server.id,
      customer_info: cart.customer.as_ref().map(|c| CustomerInfo {
        first_name: c.first_name.clone(),
        last_name: c.last_name.clone(),
        email: c.email.clone(),
      }),
    };
    (guard.app_state.clone(), server, data)
  };

  info!(
    order_id = data.order_id,
    server_id = server.id,
    total = %data.order_total,
    shipping = %data.shipping_total,
    tax = %data.tax_total,
    "Requesting PayPal order from proxy server."
  );
  let created = state.proxy.create_express_checkout(&server, &data).await?;

  ctx_data.write().paypal_order = Some(created);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "create_order::store_paypal_order_id", skip(ctx_data), err(Display))]
async fn store_paypal_order_id(ctx_data: ContextData<CreateOrderCtxData>) -> AppResult<PipelineControl> {
  let mut order = loaded_order(&ctx_data)?;
  let (orders, paypal_order_id) = {
    let guard = ctx_data.read();
    let created = guard
      .paypal_order
      .as_ref()
      .ok_or_else(|| AppError::Internal("PayPal order was not created".to_string()))?;
    (guard.app_state.orders.clone(), created.paypal_order_id.clone())
  };

  order.set_meta(meta::PAYPAL_ORDER_ID, paypal_order_id.as_str());
  orders.save_order(&order).await?;
  info!(order_id = order.id, %paypal_order_id, "PayPal order id stored.");

  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}
