// src/pipelines/contexts.rs

//! Data the checkout flows operate on. Handlers receive these wrapped in
//! `checkout_flow::ContextData`.

use crate::models::payloads::PayPalLineItem;
use crate::models::paypal::PayPalOrderDetails;
use crate::models::{CartSnapshot, CheckoutTotals, Order, ProxyServer};
use crate::services::proxy_client::{CapturedPayment, CreatedPayPalOrder};
use crate::state::AppState;

/// Access the shared steps in `common_steps` need on any order-centric flow.
pub trait OrderFlowContext: Send + Sync + 'static {
  fn app_state(&self) -> &AppState;
  fn order_id(&self) -> i64;
  fn order(&self) -> Option<&Order>;
  fn set_order(&mut self, order: Order);
  fn set_server(&mut self, server: ProxyServer);
}

macro_rules! order_flow_context {
  ($ty:ty) => {
    impl OrderFlowContext for $ty {
      fn app_state(&self) -> &AppState {
        &self.app_state
      }

      fn order_id(&self) -> i64 {
        self.order_id
      }

      fn order(&self) -> Option<&Order> {
        self.order.as_ref()
      }

      fn set_order(&mut self, order: Order) {
        self.order = Some(order);
      }

      fn set_server(&mut self, server: ProxyServer) {
        self.server = Some(server);
      }
    }
  };
}

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub session_id: String,
  pub totals: CheckoutTotals,

  pub cart: Option<CartSnapshot>,
  /// Zero until the provisional order exists.
  pub order_id: i64,
  pub order: Option<Order>,
  pub server: Option<ProxyServer>,
  pub line_items: Vec<PayPalLineItem>,
  pub paypal_order: Option<CreatedPayPalOrder>,
}

impl CreateOrderCtxData {
  pub fn new(app_state: AppState, session_id: String, totals: CheckoutTotals) -> Self {
    Self {
      app_state,
      session_id,
      totals,
      cart: None,
      order_id: 0,
      order: None,
      server: None,
      line_items: Vec::new(),
      paypal_order: None,
    }
  }
}

order_flow_context!(CreateOrderCtxData);

#[derive(Clone)]
pub struct CompleteOrderCtxData {
  pub app_state: AppState,
  pub session_id: String,
  pub order_id: i64,
  pub paypal_order_id: String,

  pub order: Option<Order>,
  /// Snapshot stored when the order was created, if any was submitted.
  pub totals: Option<CheckoutTotals>,
  pub server: Option<ProxyServer>,
  pub payment: Option<CapturedPayment>,
  pub redirect: Option<String>,
}

impl CompleteOrderCtxData {
  pub fn new(app_state: AppState, session_id: String, order_id: i64, paypal_order_id: String) -> Self {
    Self {
      app_state,
      session_id,
      order_id,
      paypal_order_id,
      order: None,
      totals: None,
      server: None,
      payment: None,
      redirect: None,
    }
  }
}

order_flow_context!(CompleteOrderCtxData);

#[derive(Clone)]
pub struct FetchDetailsCtxData {
  pub app_state: AppState,
  pub order_id: i64,
  pub paypal_order_id: String,

  pub order: Option<Order>,
  pub server: Option<ProxyServer>,
  pub details: Option<PayPalOrderDetails>,
  pub has_billing: bool,
  pub has_shipping: bool,
}

impl FetchDetailsCtxData {
  pub fn new(app_state: AppState, order_id: i64, paypal_order_id: String) -> Self {
    Self {
      app_state,
      order_id,
      paypal_order_id,
      order: None,
      server: None,
      details: None,
      has_billing: false,
      has_shipping: false,
    }
  }
}

order_flow_context!(FetchDetailsCtxData);
