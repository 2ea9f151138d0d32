// src/services/button.rs

//! Express checkout container markup and the parameters its script boots with.

use serde::Serialize;

use crate::config::AppConfig;

/// Per-request render state. A fresh value is created for every page render.
#[derive(Debug, Default)]
pub struct PageRender {
  pub checkout_button_rendered: bool,
}

/// Which storefront page the button is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
  Checkout,
  Cart,
}

impl PageKind {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "checkout" => Some(PageKind::Checkout),
      "cart" => Some(PageKind::Cart),
      _ => None,
    }
  }
}

const CONTAINER_ID: &str = "wpppc-express-paypal-button-checkout";

/// Container markup for the checkout page, at most once per render.
///
/// The caller decides whether the button is offered at all; this only keeps a
/// second call for the same render from emitting the container again.
pub fn render_checkout_button(render: &mut PageRender) -> Option<String> {
  if render.checkout_button_rendered {
    return None;
  }
  render.checkout_button_rendered = true;

  Some(format!(
    concat!(
      "<div class=\"wpppc-express-checkout-container\">",
      "<h3>Express Checkout</h3>",
      "<p>Check out faster with PayPal</p>",
      "<div id=\"{}\"></div>",
      "</div>",
      "<div class=\"wpppc-express-separator\"><span>OR</span></div>"
    ),
    CONTAINER_ID
  ))
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptParams {
  pub ajax_url: String,
  pub nonce: String,
  pub iframe_url: String,
  pub cart_total: String,
  pub currency: String,
  pub shipping_required: bool,
  pub is_checkout_page: bool,
  pub is_cart_page: bool,
  pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetBundle {
  pub script_url: String,
  pub style_url: String,
  pub version: String,
  pub params: ScriptParams,
}

impl AssetBundle {
  pub fn new(config: &AppConfig, page: PageKind, params: ScriptParams) -> Self {
    let params = ScriptParams {
      is_checkout_page: page == PageKind::Checkout,
      is_cart_page: page == PageKind::Cart,
      debug_mode: config.debug_mode,
      ..params
    };
    Self {
      script_url: format!("{}/js/express-checkout.js", config.asset_base_url),
      style_url: format!("{}/css/express-checkout.css", config.asset_base_url),
      version: config.asset_version.clone(),
      params,
    }
  }
}
