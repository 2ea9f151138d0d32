// tests/common/mod.rs
#![allow(dead_code)]

use express_checkout::config::AppConfig;
use express_checkout::models::{
  CartItem, CartSnapshot, CheckoutTotals, Customer, ProductSummary, ProxyServer, ShippingPackage, ShippingRate,
};
use express_checkout::services::csrf::EXPRESS_NONCE_ACTION;
use express_checkout::services::stores::{InMemoryCartStore, InMemoryOrderStore, InMemoryServerDirectory};
use express_checkout::state::AppState;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION: &str = "session-abc";
pub const API_KEY: &str = "test-api-key";
pub const API_SECRET: &str = "test-api-secret";
pub const SITE_URL: &str = "https://shop.example";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn dec(s: &str) -> Decimal {
  s.parse().unwrap()
}

pub struct TestApp {
  pub state: AppState,
  pub orders: Arc<InMemoryOrderStore>,
  pub carts: Arc<InMemoryCartStore>,
  pub servers: Arc<InMemoryServerDirectory>,
  pub proxy: MockServer,
}

impl TestApp {
  pub fn nonce(&self) -> String {
    self.state.csrf.issue(SESSION, EXPRESS_NONCE_ACTION).unwrap()
  }

  pub fn proxy_path(endpoint: &str) -> String {
    format!("/wp-json/wppps/v1/{}", endpoint)
  }

  /// Answers `endpoint` with `status` and `body`, expecting exactly `times` calls.
  pub async fn mock_proxy(&self, endpoint: &str, status: u16, body: Value, times: u64) {
    Mock::given(method("POST"))
      .and(path(Self::proxy_path(endpoint)))
      .respond_with(ResponseTemplate::new(status).set_body_json(body))
      .expect(times)
      .mount(&self.proxy)
      .await;
  }

  /// JSON bodies the proxy received on `endpoint`, in order.
  pub async fn proxy_bodies(&self, endpoint: &str) -> Vec<Value> {
    let wanted = Self::proxy_path(endpoint);
    self
      .proxy
      .received_requests()
      .await
      .unwrap_or_default()
      .into_iter()
      .filter(|request| request.url.path() == wanted)
      .map(|request| request.body_json::<Value>().unwrap())
      .collect()
  }
}

pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
  let mut vars: HashMap<String, String> = HashMap::from([
    ("SITE_URL".to_string(), SITE_URL.to_string()),
    ("CSRF_SECRET".to_string(), "test-csrf-secret-0123456789".to_string()),
    ("PROXY_TIMEOUT_SECS".to_string(), "5".to_string()),
  ]);
  for (name, value) in overrides {
    vars.insert(name.to_string(), value.to_string());
  }
  AppConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

pub fn proxy_server(url: &str) -> ProxyServer {
  ProxyServer {
    id: 1,
    name: "Proxy B".to_string(),
    url: url.to_string(),
    api_key: API_KEY.to_string(),
    api_secret: API_SECRET.to_string(),
    is_active: true,
    is_selected: true,
    capacity_limit: Decimal::ZERO,
    current_usage: Decimal::ZERO,
    priority: 0,
  }
}

pub async fn spawn_app() -> TestApp {
  spawn_app_with(&[], true).await
}

/// App on in-memory stores with one proxy server pointing at a wiremock instance
/// (or none when `with_server` is false), and the sample cart in `SESSION`.
pub async fn spawn_app_with(overrides: &[(&str, &str)], with_server: bool) -> TestApp {
  setup_tracing();
  let proxy = MockServer::start().await;

  let orders = Arc::new(InMemoryOrderStore::new());
  let carts = Arc::new(InMemoryCartStore::new());
  let servers = Arc::new(InMemoryServerDirectory::new(if with_server {
    vec![proxy_server(&proxy.uri())]
  } else {
    Vec::new()
  }));
  carts.put_cart(SESSION, sample_cart());

  let state = AppState::build(
    Arc::new(test_config(overrides)),
    orders.clone(),
    carts.clone(),
    servers.clone(),
  )
  .unwrap();

  TestApp {
    state,
    orders,
    carts,
    servers,
    proxy,
  }
}

/// Two mugs at 10.00 with 10% tax and a 5.00 flat rate: the storefront computes 27.00.
pub fn sample_cart() -> CartSnapshot {
  CartSnapshot {
    items: vec![CartItem {
      product: ProductSummary {
        id: 42,
        name: "Mug".to_string(),
        sku: "MUG-1".to_string(),
        short_description: "A sturdy stoneware mug".to_string(),
      },
      variation_id: None,
      variation: BTreeMap::new(),
      quantity: 2,
      line_subtotal: dec("20.00"),
      line_total: dec("20.00"),
      line_subtotal_tax: dec("2.00"),
      line_tax: dec("2.00"),
      line_tax_data: BTreeMap::from([("1".to_string(), dec("2.00"))]),
    }],
    fees: Vec::new(),
    coupons: Vec::new(),
    shipping_packages: vec![ShippingPackage {
      rates: vec![ShippingRate {
        id: "flat_rate:3".to_string(),
        method_id: "flat_rate".to_string(),
        instance_id: "3".to_string(),
        label: "Flat rate".to_string(),
        cost: dec("5.00"),
        taxes: BTreeMap::new(),
        meta: BTreeMap::new(),
      }],
    }],
    currency: "USD".to_string(),
    needs_shipping: true,
    total: dec("27.00"),
    customer: Some(Customer {
      id: 7,
      first_name: "Ada".to_string(),
      last_name: "Lovelace".to_string(),
      email: "ada@example.com".to_string(),
    }),
  }
}

/// What the browser showed: deliberately different from the computed 27.00.
pub fn submitted_totals() -> CheckoutTotals {
  CheckoutTotals {
    subtotal: Some(dec("20.00")),
    shipping: Some(dec("4.99")),
    tax: Some(dec("2.00")),
    total: Some(dec("26.99")),
    shipping_method: Some("flat_rate:3".to_string()),
  }
}

pub fn created_reply() -> Value {
  json!({ "success": true, "paypal_order_id": "PP-ORDER-1", "approve_url": "https://paypal.example/approve/PP-ORDER-1" })
}
