// src/services/stores/postgres.rs

//! Postgres backend. Orders and carts are stored as JSONB documents next to the
//! columns that are queried directly; servers are plain rows.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::{new_order_key, CartStore, OrderStore, ServerDirectory, StoreError};
use crate::models::{CartSnapshot, Order, ProxyServer};

const SCHEMA: &[&str] = &[
  r#"CREATE TABLE IF NOT EXISTS express_orders (
    id BIGSERIAL PRIMARY KEY,
    order_key TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
  )"#,
  r#"CREATE TABLE IF NOT EXISTS express_carts (
    session_id TEXT PRIMARY KEY,
    document JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
  )"#,
  r#"CREATE TABLE IF NOT EXISTS proxy_servers (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    api_key TEXT NOT NULL,
    api_secret TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    is_selected BOOLEAN NOT NULL DEFAULT FALSE,
    capacity_limit NUMERIC NOT NULL DEFAULT 0,
    current_usage NUMERIC NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 0
  )"#,
];

/// Creates the tables the stores need if they are missing.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
  for statement in SCHEMA {
    sqlx::query(*statement).execute(pool).await?;
  }
  debug!("Express checkout schema is in place.");
  Ok(())
}

#[derive(Debug, Clone)]
pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  #[instrument(skip(self))]
  async fn create_order(&self, currency: &str, customer_id: Option<i64>) -> Result<Order, StoreError> {
    let mut tx = self.pool.begin().await?;
    let order_key = new_order_key();
    let id: i64 = sqlx::query_scalar(
      "INSERT INTO express_orders (order_key, status, document) VALUES ($1, 'pending', '{}'::jsonb) RETURNING id",
    )
    .bind(&order_key)
    .fetch_one(&mut *tx)
    .await?;

    let order = Order::new_pending(id, order_key, currency, customer_id);
    sqlx::query("UPDATE express_orders SET document = $2 WHERE id = $1")
      .bind(id)
      .bind(Json(&order))
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    Ok(order)
  }

  async fn get_order(&self, order_id: i64) -> Result<Option<Order>, StoreError> {
    let row: Option<Json<Order>> = sqlx::query_scalar("SELECT document FROM express_orders WHERE id = $1")
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|Json(order)| order))
  }

  #[instrument(skip(self, order), fields(order_id = order.id))]
  async fn save_order(&self, order: &Order) -> Result<(), StoreError> {
    let mut stored = order.clone();
    stored.updated_at = chrono::Utc::now();
    let result = sqlx::query("UPDATE express_orders SET status = $2, document = $3, updated_at = $4 WHERE id = $1")
      .bind(stored.id)
      .bind(stored.status.as_str())
      .bind(Json(&stored))
      .bind(stored.updated_at)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::MissingOrder(order.id));
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct PgCartStore {
  pool: PgPool,
}

impl PgCartStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn put_cart(&self, session_id: &str, cart: &CartSnapshot) -> Result<(), StoreError> {
    sqlx::query(
      "INSERT INTO express_carts (session_id, document) VALUES ($1, $2)
       ON CONFLICT (session_id) DO UPDATE SET document = EXCLUDED.document, updated_at = now()",
    )
    .bind(session_id)
    .bind(Json(cart))
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl CartStore for PgCartStore {
  async fn load_cart(&self, session_id: &str) -> Result<CartSnapshot, StoreError> {
    let row: Option<Json<CartSnapshot>> = sqlx::query_scalar("SELECT document FROM express_carts WHERE session_id = $1")
      .bind(session_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(|Json(cart)| cart).unwrap_or_default())
  }

  async fn empty_cart(&self, session_id: &str) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM express_carts WHERE session_id = $1")
      .bind(session_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct PgServerDirectory {
  pool: PgPool,
}

const SERVER_COLUMNS: &str =
  "id, name, url, api_key, api_secret, is_active, is_selected, capacity_limit, current_usage, priority";

impl PgServerDirectory {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Inserts the server unless one with the same URL and key already exists.
  pub async fn ensure_server(&self, name: &str, url: &str, api_key: &str, api_secret: &str) -> Result<i64, StoreError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM proxy_servers WHERE url = $1 AND api_key = $2")
      .bind(url)
      .bind(api_key)
      .fetch_optional(&self.pool)
      .await?;
    if let Some(id) = existing {
      return Ok(id);
    }
    let id: i64 = sqlx::query_scalar(
      "INSERT INTO proxy_servers (name, url, api_key, api_secret, is_selected) VALUES ($1, $2, $3, $4, TRUE) RETURNING id",
    )
    .bind(name)
    .bind(url)
    .bind(api_key)
    .bind(api_secret)
    .fetch_one(&self.pool)
    .await?;
    Ok(id)
  }
}

#[async_trait]
impl ServerDirectory for PgServerDirectory {
  async fn selected_server(&self) -> Result<Option<ProxyServer>, StoreError> {
    let sql = format!(
      "SELECT {} FROM proxy_servers WHERE is_selected AND is_active ORDER BY id LIMIT 1",
      SERVER_COLUMNS
    );
    Ok(sqlx::query_as::<_, ProxyServer>(&sql).fetch_optional(&self.pool).await?)
  }

  async fn next_available_server(&self) -> Result<Option<ProxyServer>, StoreError> {
    let sql = format!(
      "SELECT {} FROM proxy_servers
       WHERE is_active AND (capacity_limit = 0 OR current_usage < capacity_limit)
       ORDER BY priority ASC, current_usage ASC, id ASC LIMIT 1",
      SERVER_COLUMNS
    );
    Ok(sqlx::query_as::<_, ProxyServer>(&sql).fetch_optional(&self.pool).await?)
  }

  async fn get_server(&self, server_id: i64) -> Result<Option<ProxyServer>, StoreError> {
    let sql = format!("SELECT {} FROM proxy_servers WHERE id = $1", SERVER_COLUMNS);
    Ok(
      sqlx::query_as::<_, ProxyServer>(&sql)
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn add_server_usage(&self, server_id: i64, amount: Decimal) -> Result<(), StoreError> {
    sqlx::query("UPDATE proxy_servers SET current_usage = current_usage + $2 WHERE id = $1")
      .bind(server_id)
      .bind(amount)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}
