// src/pipelines/common_steps.rs

//! Steps shared by every flow that starts from an existing order.

use checkout_flow::{ContextData, PipelineControl};
use tracing::{debug, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::models::{meta, Order, ProxyServer};
use crate::pipelines::contexts::OrderFlowContext;

/// The order a previous step loaded. Missing means the flow was assembled wrong.
pub fn loaded_order<T: OrderFlowContext>(ctx_data: &ContextData<T>) -> AppResult<Order> {
  ctx_data
    .read()
    .order()
    .cloned()
    .ok_or_else(|| AppError::Internal("order was not loaded before use".to_string()))
}

#[instrument(name = "common_step::load_order", skip(ctx_data), err(Display))]
pub async fn load_order<T: OrderFlowContext>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (orders, order_id) = {
    let guard = ctx_data.read();
    (guard.app_state().orders.clone(), guard.order_id())
  };

  let order = orders.get_order(order_id).await?.ok_or_else(|| {
    warn!(order_id, "Order not found.");
    AppError::NotFound("Order not found".to_string())
  })?;
  debug!(order_id, status = %order.status, "Order loaded.");

  ctx_data.write().set_order(order);
  Ok(PipelineControl::Continue)
}

/// Resolves the proxy server pinned on the order when it was created.
#[instrument(name = "common_step::resolve_pinned_server", skip(ctx_data), err(Display))]
pub async fn resolve_pinned_server<T: OrderFlowContext>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let servers = ctx_data.read().app_state().servers.clone();

  let server_id = order
    .meta_str(meta::SERVER_ID)
    .and_then(|raw| raw.parse::<i64>().ok())
    .ok_or_else(|| AppError::NotFound("Server ID not found for order".to_string()))?;

  let server: ProxyServer = servers
    .get_server(server_id)
    .await?
    .ok_or_else(|| AppError::NotFound("PayPal server not found".to_string()))?;
  debug!(order_id = order.id, server_id, "Pinned proxy server resolved.");

  ctx_data.write().set_server(server);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "common_step::save_order", skip(ctx_data), err(Display))]
pub async fn save_order<T: OrderFlowContext>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let order = loaded_order(&ctx_data)?;
  let orders = ctx_data.read().app_state().orders.clone();
  orders.save_order(&order).await?;
  Ok(PipelineControl::Continue)
}
