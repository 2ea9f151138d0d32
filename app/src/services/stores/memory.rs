// src/services/stores/memory.rs
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{new_order_key, CartStore, OrderStore, ServerDirectory, StoreError};
use crate::models::{CartSnapshot, Order, ProxyServer};

#[derive(Debug, Default)]
struct OrderTable {
  next_id: i64,
  rows: HashMap<i64, Order>,
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
  table: Mutex<OrderTable>,
}

impl InMemoryOrderStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Every stored order, ordered by id.
  pub fn orders(&self) -> Vec<Order> {
    let table = self.table.lock();
    let mut orders: Vec<Order> = table.rows.values().cloned().collect();
    orders.sort_by_key(|o| o.id);
    orders
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn create_order(&self, currency: &str, customer_id: Option<i64>) -> Result<Order, StoreError> {
    let mut table = self.table.lock();
    table.next_id += 1;
    let order = Order::new_pending(table.next_id, new_order_key(), currency, customer_id);
    table.rows.insert(order.id, order.clone());
    Ok(order)
  }

  async fn get_order(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
    Ok(self.table.lock().rows.get(&order_id).cloned())
  }

  async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
    let mut table = self.table.lock();
    let Some(row) = table.rows.get_mut(&order.id) else {
      return Err(StoreError::MissingOrder(order.id));
    };
    *row = order.clone();
    row.updated_at = chrono::Utc::now();
    Ok(())
  }
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
  carts: Mutex<HashMap<String, CartSnapshot>>,
}

impl InMemoryCartStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put_cart(&self, session_id: &str, cart: CartSnapshot) {
    self.carts.lock().insert(session_id.to_string(), cart);
  }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
  async fn load_cart(&self, session_id: &str) -> Result<CartSnapshot, StoreError> {
    Ok(self.carts.lock().get(session_id).cloned().unwrap_or_default())
  }

  async fn empty_cart(&self, session_id: &str) -> Result<(), StoreError> {
    self.carts.lock().remove(session_id);
    Ok(())
  }
}

#[derive(Debug, Default)]
pub struct InMemoryServerDirectory {
  servers: Mutex<Vec<ProxyServer>>,
}

impl InMemoryServerDirectory {
  pub fn new(servers: Vec<ProxyServer>) -> Self {
    Self {
      servers: Mutex::new(servers),
    }
  }

  pub fn servers(&self) -> Vec<ProxyServer> {
    self.servers.lock().clone()
  }
}

#[async_trait]
impl ServerDirectory for InMemoryServerDirectory {
  async fn selected_server(&self) -> Result<Option<ProxyServer>, StoreError> {
    Ok(self.servers.lock().iter().find(|s| s.is_selected && s.is_active).cloned())
  }

  async fn next_available_server(&self) -> Result<Option<ProxyServer>, StoreError> {
    let servers = self.servers.lock();
    Ok(
      servers
        .iter()
        .filter(|s| s.is_active && s.has_capacity())
        .min_by(|a, b| a.priority.cmp(&b.priority).then(a.current_usage.cmp(&b.current_usage)))
        .cloned(),
    )
  }

  async fn get_server(&self, server_id: i64) -> Result<Option<ProxyServer>, StoreError> {
    Ok(self.servers.lock().iter().find(|s| s.id == server_id).cloned())
  }

  async fn add_server_usage(&self, server_id: i64, amount: Decimal) -> Result<(), StoreError> {
    if let Some(server) = self.servers.lock().iter_mut().find(|s| s.id == server_id) {
      server.current_usage += amount;
    }
    Ok(())
  }
}
