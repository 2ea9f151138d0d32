// tests/http_routes_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::*;
use express_checkout::services::csrf::EXPRESS_NONCE_ACTION;
use express_checkout::services::proxy_client::{CAPTURE_EXPRESS_PAYMENT, CREATE_EXPRESS_CHECKOUT, MIRROR_ORDER};
use express_checkout::services::stores::{InMemoryCartStore, InMemoryOrderStore, InMemoryServerDirectory};
use express_checkout::state::AppState;
use express_checkout::web::configure_app_routes;
use serde_json::{json, Value};
use std::sync::Arc;

macro_rules! init_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

fn create_body(nonce: &str) -> Value {
  json!({
    "nonce": nonce,
    "current_totals": {
      "subtotal": "20.00",
      "shipping": "4.99",
      "tax": "2.00",
      "total": "26.99",
      "shipping_method": "flat_rate:3"
    }
  })
}

#[actix_web::test]
async fn health_check_answers_ok() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let resp = test::call_service(&service, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn create_order_round_trip_over_http() {
  let app = spawn_app().await;
  app.mock_proxy(CREATE_EXPRESS_CHECKOUT, 200, created_reply(), 1).await;
  let service = init_app!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/create-order")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(create_body(&app.nonce()))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["data"]["paypal_order_id"], "PP-ORDER-1");
  assert_eq!(body["data"]["approveUrl"], "https://paypal.example/approve/PP-ORDER-1");
  assert!(body["data"]["order_id"].as_i64().unwrap() > 0);
}

#[actix_web::test]
async fn session_cookie_is_accepted() {
  let app = spawn_app().await;
  app.mock_proxy(CREATE_EXPRESS_CHECKOUT, 200, created_reply(), 1).await;
  let service = init_app!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/create-order")
    .cookie(actix_web::cookie::Cookie::new("wpppc_session", SESSION))
    .set_json(create_body(&app.nonce()))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn bad_nonce_is_forbidden() {
  let app = spawn_app().await;
  app.mock_proxy(CREATE_EXPRESS_CHECKOUT, 200, created_reply(), 0).await;
  let service = init_app!(app.state);

  let other_session_nonce = app.state.csrf.issue("someone-else", EXPRESS_NONCE_ACTION).unwrap();
  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/create-order")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(create_body(&other_session_nonce))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);
  assert_eq!(body["data"]["message"], "Security check failed");
  assert!(app.orders.orders().is_empty());
}

#[actix_web::test]
async fn missing_session_is_a_bad_request() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/create-order")
    .set_json(create_body(&app.nonce()))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn empty_cart_is_reported_in_the_envelope() {
  let app = spawn_app().await;
  app.carts.put_cart(SESSION, Default::default());
  let service = init_app!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/create-order")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(create_body(&app.nonce()))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({ "success": false, "data": { "message": "Your cart is empty" } }));
}

#[actix_web::test]
async fn undecodable_bodies_get_the_failure_envelope() {
  let app = spawn_app().await;
  app.mock_proxy(CREATE_EXPRESS_CHECKOUT, 200, created_reply(), 0).await;
  let service = init_app!(app.state);
  let nonce = app.nonce();

  let cases = [
    (
      "/api/v1/express-checkout/create-order",
      json!({ "nonce": nonce, "current_totals": { "total": "free" } }),
    ),
    (
      "/api/v1/express-checkout/complete-order",
      json!({ "nonce": nonce, "order_id": "abc", "paypal_order_id": "PP-ORDER-1" }),
    ),
    (
      "/api/v1/express-checkout/fetch-order-details",
      json!({ "order_id": 1, "paypal_order_id": "PP-ORDER-1" }),
    ),
  ];

  for (uri, payload) in cases {
    let req = test::TestRequest::post()
      .uri(uri)
      .insert_header(("X-Session-Id", SESSION))
      .set_json(payload)
      .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false, "{}", uri);
    let message = body["data"]["message"].as_str().unwrap();
    assert!(message.starts_with("Invalid request"), "{}: {}", uri, message);
  }
  assert!(app.orders.orders().is_empty());
}

#[actix_web::test]
async fn complete_order_returns_redirect() {
  let app = spawn_app().await;
  app.mock_proxy(CREATE_EXPRESS_CHECKOUT, 200, created_reply(), 1).await;
  app
    .mock_proxy(CAPTURE_EXPRESS_PAYMENT, 200, json!({ "success": true, "transaction_id": "TX-1" }), 1)
    .await;
  app.mock_proxy(MIRROR_ORDER, 200, json!({ "success": true }), 1).await;
  let service = init_app!(app.state);
  let nonce = app.nonce();

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/create-order")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(create_body(&nonce))
    .to_request();
  let created: Value = test::call_and_read_body_json(&service, req).await;
  let order_id = created["data"]["order_id"].as_i64().unwrap();

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/complete-order")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(json!({ "nonce": nonce, "order_id": order_id.to_string(), "paypal_order_id": "PP-ORDER-1" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let body: Value = test::read_body_json(resp).await;
  let redirect = body["data"]["redirect"].as_str().unwrap();
  assert!(redirect.starts_with(&format!("{}/checkout/order-received/{}/?key=wc_order_", SITE_URL, order_id)));
}

#[actix_web::test]
async fn complete_order_requires_paypal_order_id() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/complete-order")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(json!({ "nonce": app.nonce(), "order_id": 1 }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_details_for_unknown_order_is_not_found() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/express-checkout/fetch-order-details")
    .insert_header(("X-Session-Id", SESSION))
    .set_json(json!({ "nonce": app.nonce(), "order_id": 404, "paypal_order_id": "PP-X" }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["message"], "Order not found");
}

#[actix_web::test]
async fn checkout_button_carries_container_and_script_params() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let req = test::TestRequest::get()
    .uri("/api/v1/express-checkout/button?page=checkout")
    .insert_header(("X-Session-Id", SESSION))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let body: Value = test::read_body_json(resp).await;
  let data = &body["data"];
  assert!(data["html"].as_str().unwrap().contains("wpppc-express-paypal-button-checkout"));

  let params = &data["assets"]["params"];
  assert_eq!(params["ajax_url"], format!("{}/api/v1/express-checkout", SITE_URL));
  assert_eq!(params["currency"], "USD");
  assert_eq!(params["is_checkout_page"], true);
  assert_eq!(params["is_cart_page"], false);
  assert_eq!(params["shipping_required"], true);
  let nonce = params["nonce"].as_str().unwrap();
  assert!(app.state.csrf.verify(nonce, SESSION, EXPRESS_NONCE_ACTION).unwrap());

  let iframe = params["iframe_url"].as_str().unwrap();
  assert!(iframe.starts_with(&format!("{}/wp-json/wppps/v1/express-checkout-buttons?", app.proxy.uri())));
  assert!(iframe.contains("needs_shipping=1"));
  assert!(iframe.contains("server_id=1"));
  assert!(data["assets"]["script_url"].as_str().unwrap().ends_with("/js/express-checkout.js"));
}

#[actix_web::test]
async fn cart_page_gets_params_without_container() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let req = test::TestRequest::get()
    .uri("/api/v1/express-checkout/button?page=cart")
    .insert_header(("X-Session-Id", SESSION))
    .to_request();
  let body: Value = test::call_and_read_body_json(&service, req).await;
  assert!(body["data"]["html"].is_null());
  assert_eq!(body["data"]["assets"]["params"]["is_cart_page"], true);
}

#[actix_web::test]
async fn button_is_silent_when_gateway_disabled_or_no_server() {
  let disabled = spawn_app_with(&[("GATEWAY_ENABLED", "no")], true).await;
  let service = init_app!(disabled.state);
  let req = test::TestRequest::get()
    .uri("/api/v1/express-checkout/button")
    .insert_header(("X-Session-Id", SESSION))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NO_CONTENT);

  let serverless = spawn_app_with(&[], false).await;
  let service = init_app!(serverless.state);
  let req = test::TestRequest::get()
    .uri("/api/v1/express-checkout/button")
    .insert_header(("X-Session-Id", SESSION))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn button_is_left_out_when_it_cannot_be_prepared() {
  setup_tracing();
  let carts = Arc::new(InMemoryCartStore::new());
  carts.put_cart(SESSION, sample_cart());
  let state = AppState::build(
    Arc::new(test_config(&[])),
    Arc::new(InMemoryOrderStore::new()),
    carts,
    Arc::new(InMemoryServerDirectory::new(vec![proxy_server("not a url")])),
  )
  .unwrap();
  let service = init_app!(state);

  let req = test::TestRequest::get()
    .uri("/api/v1/express-checkout/button?page=checkout")
    .insert_header(("X-Session-Id", SESSION))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn unknown_button_page_is_a_bad_request() {
  let app = spawn_app().await;
  let service = init_app!(app.state);

  let req = test::TestRequest::get()
    .uri("/api/v1/express-checkout/button?page=shop")
    .insert_header(("X-Session-Id", SESSION))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["message"], "Unknown page 'shop'");
}
