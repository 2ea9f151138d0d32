// src/pipelines/mod.rs

//! The three express checkout flows and their registration against named routes.

use checkout_flow::Flows;

use crate::errors::AppError;

pub mod common_steps;
pub mod contexts;
pub mod reconcile;

pub mod address_pipeline;
pub mod complete_order_pipeline;
pub mod create_order_pipeline;

pub const CREATE_EXPRESS_ORDER: &str = "wpppc_create_express_order";
pub const COMPLETE_EXPRESS_ORDER: &str = "wpppc_complete_express_order";
pub const FETCH_PAYPAL_ORDER_DETAILS: &str = "wpppc_fetch_paypal_order_details";

/// Binds every express checkout flow to its route. Called once at startup.
pub fn register_all_pipelines(flows: &Flows<AppError>) {
  tracing::info!("Registering express checkout flows...");

  flows.register(CREATE_EXPRESS_ORDER, create_order_pipeline::build());
  flows.register(COMPLETE_EXPRESS_ORDER, complete_order_pipeline::build());
  flows.register(FETCH_PAYPAL_ORDER_DETAILS, address_pipeline::build());

  tracing::info!(routes = ?flows.routes(), "Express checkout flows registered.");
}
