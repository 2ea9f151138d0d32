// src/registry.rs

//! `Flows<E>`: a registry that dispatches pipelines by named request route.
//!
//! Each route owns exactly one pipeline. Callers run a route with a
//! `ContextData<TData>`; the registry checks that `TData` is the context type the
//! route was registered with before handing it to the pipeline.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait FlowRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` holds a `ContextData<TData>` for the runner's own `TData`.
  async fn run_erased(&self, route: &str, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct RegisteredFlow<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> FlowRunner<AppErr> for RegisteredFlow<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, route: &str, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, %route, %expected_type, "Context type does not match the registered flow.");
        return Err(AppErr::from(FlowError::ContextMismatch {
          route: route.to_string(),
          expected_type: expected_type.to_string(),
        }));
      }
    };

    self.pipeline.run(ctx_data).await.map_err(AppErr::from)
  }
}

/// Route-keyed registry of flows.
///
/// `AppErr` is what [`Flows::run`] returns; it must absorb both the engine's
/// own [`FlowError`] and each registered pipeline's handler error.
pub struct Flows<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  routes: RwLock<HashMap<String, Arc<dyn FlowRunner<AppErr>>>>,
}

impl<AppErr> Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      routes: RwLock::new(HashMap::new()),
    }
  }

  /// Binds `pipeline` to `route`. A later registration for the same route replaces the earlier one.
  pub fn register<TData, HandlerErr>(&self, route: impl Into<String>, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    let route = route.into();
    event!(
      Level::DEBUG,
      %route,
      pipeline = %pipeline.name(),
      context_type = %std::any::type_name::<TData>(),
      "Registering flow."
    );
    let runner = RegisteredFlow::<TData, HandlerErr, AppErr> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    };
    if self.routes.write().insert(route.clone(), Arc::new(runner)).is_some() {
      event!(Level::WARN, %route, "Replaced a previously registered flow.");
    }
  }

  pub fn contains(&self, route: &str) -> bool {
    self.routes.read().contains_key(route)
  }

  /// Registered route names, sorted.
  pub fn routes(&self) -> Vec<String> {
    let mut names: Vec<String> = self.routes.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Runs the flow bound to `route` against `ctx_data`.
  #[instrument(name = "Flows::run", skip(self, ctx_data), fields(context_type = %std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, route: &str, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = {
      let routes = self.routes.read();
      routes.get(route).cloned()
    };
    let Some(runner) = runner else {
      event!(Level::ERROR, "No flow registered for route.");
      return Err(AppErr::from(FlowError::RouteNotFound {
        route: route.to_string(),
      }));
    };

    runner.run_erased(route, Box::new(ctx_data)).await
  }
}

impl<AppErr> Default for Flows<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
