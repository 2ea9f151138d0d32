// src/web/handlers/express_handlers.rs

use actix_web::{web, HttpResponse};
use checkout_flow::{ContextData, PipelineResult};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::session::{lenient_id, CheckoutSession};
use crate::errors::AppError;
use crate::models::CheckoutTotals;
use crate::pipelines::address_pipeline::DETAILS_UPDATED_MESSAGE;
use crate::pipelines::contexts::{CompleteOrderCtxData, CreateOrderCtxData, FetchDetailsCtxData};
use crate::pipelines::{COMPLETE_EXPRESS_ORDER, CREATE_EXPRESS_ORDER, FETCH_PAYPAL_ORDER_DETAILS};
use crate::state::AppState;
use crate::web::response::json_success;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
  pub nonce: String,
  #[serde(default)]
  pub current_totals: CheckoutTotals,
}

#[derive(Debug, Deserialize)]
pub struct OrderActionRequest {
  pub nonce: String,
  #[serde(deserialize_with = "lenient_id")]
  pub order_id: i64,
  #[serde(default)]
  pub paypal_order_id: String,
}

impl OrderActionRequest {
  fn validate(&self) -> Result<(), AppError> {
    if self.order_id <= 0 {
      return Err(AppError::Validation("Invalid order ID".to_string()));
    }
    if self.paypal_order_id.trim().is_empty() {
      return Err(AppError::Validation("Missing PayPal order ID".to_string()));
    }
    Ok(())
  }
}

fn halted(route: &str) -> AppError {
  warn!(%route, "Express checkout flow was stopped before completing.");
  AppError::PipelineHaltedByHandler
}

#[instrument(name = "handler::create_express_order", skip_all, fields(session_id = %session.id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  session: CheckoutSession,
  payload: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let request = payload.into_inner();
  session.check_nonce(&app_state, &request.nonce)?;

  let ctx = CreateOrderCtxData::new(app_state.get_ref().clone(), session.id.clone(), request.current_totals);
  let ctx_data = ContextData::new(ctx);

  match app_state.flows.run(CREATE_EXPRESS_ORDER, ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      let created = guard
        .paypal_order
        .as_ref()
        .ok_or_else(|| AppError::Internal("create-order flow finished without a PayPal order".to_string()))?;
      info!(order_id = guard.order_id, paypal_order_id = %created.paypal_order_id, "Express order created.");
      Ok(json_success(json!({
        "order_id": guard.order_id,
        "paypal_order_id": created.paypal_order_id,
        "approveUrl": created.approve_url,
      })))
    }
    Ok(PipelineResult::Stopped) => Err(halted(CREATE_EXPRESS_ORDER)),
    Err(app_err) => {
      warn!(error = %app_err, "Creating express order failed.");
      Err(app_err)
    }
  }
}

#[instrument(
  name = "handler::complete_express_order",
  skip_all,
  fields(order_id = payload.order_id, paypal_order_id = %payload.paypal_order_id)
)]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  session: CheckoutSession,
  payload: web::Json<OrderActionRequest>,
) -> Result<HttpResponse, AppError> {
  let request = payload.into_inner();
  session.check_nonce(&app_state, &request.nonce)?;
  request.validate()?;

  let ctx = CompleteOrderCtxData::new(
    app_state.get_ref().clone(),
    session.id.clone(),
    request.order_id,
    request.paypal_order_id,
  );
  let ctx_data = ContextData::new(ctx);

  match app_state.flows.run(COMPLETE_EXPRESS_ORDER, ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let redirect = ctx_data
        .read()
        .redirect
        .clone()
        .ok_or_else(|| AppError::Internal("complete-order flow finished without a redirect".to_string()))?;
      info!(%redirect, "Express order completed.");
      Ok(json_success(json!({ "redirect": redirect })))
    }
    Ok(PipelineResult::Stopped) => Err(halted(COMPLETE_EXPRESS_ORDER)),
    Err(app_err) => {
      warn!(error = %app_err, "Completing express order failed.");
      Err(app_err)
    }
  }
}

#[instrument(
  name = "handler::fetch_paypal_order_details",
  skip_all,
  fields(order_id = payload.order_id, paypal_order_id = %payload.paypal_order_id)
)]
pub async fn fetch_order_details_handler(
  app_state: web::Data<AppState>,
  session: CheckoutSession,
  payload: web::Json<OrderActionRequest>,
) -> Result<HttpResponse, AppError> {
  let request = payload.into_inner();
  session.check_nonce(&app_state, &request.nonce)?;
  request.validate()?;

  let ctx = FetchDetailsCtxData::new(app_state.get_ref().clone(), request.order_id, request.paypal_order_id);
  let ctx_data = ContextData::new(ctx);

  match app_state.flows.run(FETCH_PAYPAL_ORDER_DETAILS, ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let guard = ctx_data.read();
      Ok(json_success(json!({
        "message": DETAILS_UPDATED_MESSAGE,
        "has_billing": guard.has_billing,
        "has_shipping": guard.has_shipping,
      })))
    }
    Ok(PipelineResult::Stopped) => Err(halted(FETCH_PAYPAL_ORDER_DETAILS)),
    Err(app_err) => {
      warn!(error = %app_err, "Fetching PayPal order details failed.");
      Err(app_err)
    }
  }
}
