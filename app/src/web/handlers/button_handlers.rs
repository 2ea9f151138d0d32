// src/web/handlers/button_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::session::CheckoutSession;
use crate::errors::AppError;
use crate::services::button::{render_checkout_button, AssetBundle, PageKind, PageRender, ScriptParams};
use crate::services::csrf::EXPRESS_NONCE_ACTION;
use crate::services::proxy_client::ButtonFrameParams;
use crate::state::AppState;
use crate::web::response::json_success;

#[derive(Debug, Deserialize)]
pub struct ButtonQuery {
  #[serde(default)]
  pub page: Option<String>,
}

/// Container markup and script parameters for the express button.
///
/// Answers 204 when the gateway is disabled, no proxy server is available, or
/// the button cannot be prepared. Normal checkout carries on without it.
#[instrument(name = "handler::express_button", skip_all, fields(session_id = %session.id))]
pub async fn express_button_handler(
  app_state: web::Data<AppState>,
  session: CheckoutSession,
  query: web::Query<ButtonQuery>,
) -> Result<HttpResponse, AppError> {
  let page = match query.page.as_deref() {
    None => PageKind::Checkout,
    Some(raw) => PageKind::parse(raw).ok_or_else(|| AppError::Validation(format!("Unknown page '{}'", raw)))?,
  };

  if !app_state.config.gateway_enabled {
    debug!("Gateway disabled; no express button.");
    return Ok(HttpResponse::NoContent().finish());
  }

  match button_payload(&app_state, &session, page).await {
    Ok(Some(payload)) => Ok(json_success(payload)),
    Ok(None) => {
      debug!("No proxy server available; no express button.");
      Ok(HttpResponse::NoContent().finish())
    }
    Err(e) => {
      warn!(error = %e, "Express button could not be prepared; leaving it out.");
      Ok(HttpResponse::NoContent().finish())
    }
  }
}

async fn button_payload(state: &AppState, session: &CheckoutSession, page: PageKind) -> Result<Option<Value>, AppError> {
  let Some(server) = state.servers.resolve_server().await? else {
    return Ok(None);
  };

  let cart = state.carts.load_cart(&session.id).await?;
  let cart_total = cart.total.to_string();
  let iframe_url = state.proxy.express_button_url(
    &server,
    &ButtonFrameParams {
      currency: &cart.currency,
      amount: &cart_total,
      needs_shipping: cart.needs_shipping,
    },
  )?;

  let mut render = PageRender::default();
  let html = match page {
    PageKind::Checkout => render_checkout_button(&mut render),
    PageKind::Cart => None,
  };

  let params = ScriptParams {
    ajax_url: state.config.ajax_url(),
    nonce: state.csrf.issue(&session.id, EXPRESS_NONCE_ACTION)?,
    iframe_url,
    cart_total,
    currency: cart.currency.clone(),
    shipping_required: cart.needs_shipping,
    is_checkout_page: false,
    is_cart_page: false,
    debug_mode: false,
  };
  let assets = AssetBundle::new(&state.config, page, params);

  Ok(Some(json!({ "html": html, "assets": assets })))
}
