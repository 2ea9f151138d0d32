// src/state.rs
use checkout_flow::Flows;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::csrf::CsrfGuard;
use crate::services::product_mapping::{MappingTable, ProductMapper};
use crate::services::proxy_client::ProxyClient;
use crate::services::stores::{CartStore, OrderStore, ServerDirectory};

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub flows: Arc<Flows<AppError>>,
  pub orders: Arc<dyn OrderStore>,
  pub carts: Arc<dyn CartStore>,
  pub servers: Arc<dyn ServerDirectory>,
  pub proxy: ProxyClient,
  pub csrf: CsrfGuard,
  pub product_mapper: Option<Arc<dyn ProductMapper>>,
}

impl AppState {
  /// Wires the stores into a ready state with every checkout flow registered.
  pub fn build(
    config: Arc<AppConfig>,
    orders: Arc<dyn OrderStore>,
    carts: Arc<dyn CartStore>,
    servers: Arc<dyn ServerDirectory>,
  ) -> Result<Self> {
    let proxy = ProxyClient::new(config.proxy_timeout)?;
    let csrf = CsrfGuard::new(config.csrf_secret.clone());

    let product_mapper = match config.product_mappings.as_deref() {
      Some(raw) => {
        let table = MappingTable::from_json(raw)
          .map_err(|e| AppError::Config(format!("Invalid PRODUCT_MAPPINGS: {}", e)))?;
        tracing::info!(mappings = table.len(), "Product mappings loaded.");
        Some(Arc::new(table) as Arc<dyn ProductMapper>)
      }
      None => None,
    };

    let flows = Arc::new(Flows::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Ok(Self {
      config,
      flows,
      orders,
      carts,
      servers,
      proxy,
      csrf,
      product_mapper,
    })
  }
}
