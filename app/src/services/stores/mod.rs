// src/services/stores/mod.rs

//! Storage seams for orders, carts and proxy servers.
//!
//! Flows only see these traits. `memory` backs tests and database-less runs,
//! `postgres` is the production backend.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{CartSnapshot, Order, ProxyServer};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCartStore, InMemoryOrderStore, InMemoryServerDirectory};
pub use postgres::{PgCartStore, PgOrderStore, PgServerDirectory};

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Stored document could not be decoded: {0}")]
  Serde(#[from] serde_json::Error),

  #[error("Order {0} does not exist")]
  MissingOrder(i64),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Inserts an empty pending order and returns it with its id and key assigned.
  async fn create_order(&self, currency: &str, customer_id: Option<i64>) -> Result<Order, StoreError>;

  async fn get_order(&self, order_id: i64) -> Result<Option<Order>, StoreError>;

  /// Persists the whole order, lines and metadata included.
  async fn save_order(&self, order: &Order) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  /// The session's cart; an unknown session has an empty cart.
  async fn load_cart(&self, session_id: &str) -> Result<CartSnapshot, StoreError>;

  async fn empty_cart(&self, session_id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ServerDirectory: Send + Sync {
  /// The server an administrator pinned, if it is active.
  async fn selected_server(&self) -> Result<Option<ProxyServer>, StoreError>;

  /// Best active server with remaining capacity: lowest priority first, then least used.
  async fn next_available_server(&self) -> Result<Option<ProxyServer>, StoreError>;

  async fn get_server(&self, server_id: i64) -> Result<Option<ProxyServer>, StoreError>;

  async fn add_server_usage(&self, server_id: i64, amount: Decimal) -> Result<(), StoreError>;

  /// Selected server, otherwise the next available one.
  async fn resolve_server(&self) -> Result<Option<ProxyServer>, StoreError> {
    match self.selected_server().await? {
      Some(server) => Ok(Some(server)),
      None => self.next_available_server().await,
    }
  }
}

/// Order keys follow the storefront's `wc_order_<random>` shape.
pub(crate) fn new_order_key() -> String {
  format!("wc_order_{}", &uuid::Uuid::new_v4().simple().to_string()[..13])
}
