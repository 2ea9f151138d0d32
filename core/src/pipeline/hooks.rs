// src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use tracing::{event, Level};

/// The three handler slots of a step, run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub const ALL: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Before => f.write_str("before"),
      Phase::On => f.write_str("on"),
      Phase::After => f.write_str("after"),
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) fn handlers(&self, phase: Phase) -> &HashMap<String, Vec<Handler<TData, Err>>> {
    match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    }
  }

  fn handlers_mut(&mut self, phase: Phase) -> &mut HashMap<String, Vec<Handler<TData, Err>>> {
    match phase {
      Phase::Before => &mut self.before,
      Phase::On => &mut self.on,
      Phase::After => &mut self.after,
    }
  }

  /// Attaches `handler_fn` to `phase` of `step_name`.
  ///
  /// The handler's own error type only needs to convert into the pipeline's
  /// `Err`. Panics if the step does not exist.
  pub fn add_handler<F, HandlerErr>(
    &mut self,
    phase: Phase,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.step_index(step_name);
    let handler: Handler<TData, Err> = Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    });
    self.handlers_mut(phase).entry(step_name.to_string()).or_default().push(handler);
    event!(Level::TRACE, pipeline = %self.name, %step_name, %phase, "Handler registered.");
  }

  pub fn before<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::Before, step_name, handler_fn);
  }

  pub fn on<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::On, step_name, handler_fn);
  }

  pub fn after<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::After, step_name, handler_fn);
  }

  /// Number of handlers registered for a step across all phases.
  pub fn handler_count(&self, step_name: &str) -> usize {
    Phase::ALL
      .iter()
      .map(|phase| self.handlers(*phase).get(step_name).map_or(0, Vec::len))
      .sum()
  }
}
