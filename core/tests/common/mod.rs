// tests/common/mod.rs
#![allow(dead_code)]

use checkout_flow::{ContextData, FlowError, Handler, PipelineControl};
use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

/// A small order-ledger context: each step posts an amount and records itself.
#[derive(Clone, Debug, Default)]
pub struct LedgerContext {
  pub total_cents: i64,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub cart_empty: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Flow error: {0}")]
  Flow(String),

  #[error("Step failed: {0}")]
  Step(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Adds `cents` to the ledger and records `step_name`; stops when `stop_at` names this step.
pub fn posting_handler(step_name: &'static str, cents: i64) -> Handler<LedgerContext, TestError> {
  Box::new(move |ctx: ContextData<LedgerContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.total_cents += cents;
      guard.trail.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, total = guard.total_cents, "posted");
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> Handler<LedgerContext, TestError> {
  Box::new(move |ctx: ContextData<LedgerContext>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      Err(TestError::Step(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub static HANDLER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
}
