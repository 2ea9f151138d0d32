// tests/pipeline_execution_tests.rs
mod common;

use checkout_flow::{ContextData, Phase, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use common::*;
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn three_step_pipeline() -> Pipeline<LedgerContext, TestError> {
  let mut p = Pipeline::new(
    "ledger",
    &[("subtotal", false, None), ("shipping", false, None), ("tax", false, None)],
  );
  p.on("subtotal", posting_handler("subtotal", 2000));
  p.on("shipping", posting_handler("shipping", 500));
  p.on("tax", posting_handler("tax", 250));
  p
}

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  let pipeline = three_step_pipeline();

  let ctx = ContextData::new(LedgerContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Completed));
  let guard = ctx.read();
  assert_eq!(guard.total_cents, 2750);
  assert_eq!(guard.trail, vec!["subtotal", "shipping", "tax"]);
}

#[tokio::test]
#[serial]
async fn stop_halts_remaining_steps() {
  setup_tracing();
  let pipeline = three_step_pipeline();

  let ctx = ContextData::new(LedgerContext {
    stop_at: Some("shipping".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result, Ok(PipelineResult::Stopped));
  let guard = ctx.read();
  assert_eq!(guard.total_cents, 2500);
  assert_eq!(guard.trail, vec!["subtotal", "shipping"]);
}

#[tokio::test]
#[serial]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new("phases", &[("capture", false, None)]);
  p.after("capture", posting_handler("after", 1));
  p.on("capture", posting_handler("on", 10));
  p.before("capture", posting_handler("before", 100));

  let ctx = ContextData::new(LedgerContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().trail, vec!["before", "on", "after"]);
  assert_eq!(ctx.read().total_cents, 111);
}

#[tokio::test]
#[serial]
async fn stop_in_before_phase_skips_on_handlers() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new("guarded", &[("load_cart", false, None), ("charge", false, None)]);
  p.before("load_cart", |ctx: ContextData<LedgerContext>| async move {
    let empty = ctx.read().cart_empty;
    Ok::<_, TestError>(if empty { PipelineControl::Stop } else { PipelineControl::Continue })
  });
  p.on("load_cart", posting_handler("load_cart", 0));
  p.on("charge", posting_handler("charge", 900));

  let ctx = ContextData::new(LedgerContext {
    cart_empty: true,
    ..Default::default()
  });
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Stopped));
  assert!(ctx.read().trail.is_empty());
  assert_eq!(ctx.read().total_cents, 0);
}

#[tokio::test]
#[serial]
async fn skip_condition_reads_context() {
  setup_tracing();
  let no_shipping: SkipCondition<LedgerContext> = Arc::new(|data: &LedgerContext| data.total_cents > 10_000);
  let mut p = Pipeline::<LedgerContext, TestError>::new(
    "free_shipping",
    &[("subtotal", false, None), ("shipping", false, Some(no_shipping))],
  );
  p.on("subtotal", |ctx: ContextData<LedgerContext>| async move {
    ctx.update(|data| {
      data.total_cents = 12_000;
      data.trail.push("subtotal".to_string());
    });
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  p.on("shipping", posting_handler("shipping", 500));

  let ctx = ContextData::new(LedgerContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().trail, vec!["subtotal"]);
  assert_eq!(ctx.read().total_cents, 12_000);
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_passed_over() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new(
    "mirror_optional",
    &[("capture", false, None), ("mirror", true, None), ("empty_cart", false, None)],
  );
  p.on("capture", posting_handler("capture", 100));
  p.on("empty_cart", posting_handler("empty_cart", 0));

  let ctx = ContextData::new(LedgerContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().trail, vec!["capture", "empty_cart"]);
}

#[tokio::test]
#[serial]
async fn step_editing_changes_execution() {
  setup_tracing();
  reset_counters();
  let mut p = three_step_pipeline();
  p.insert_after_step("shipping", "discount", false, None);
  p.on("discount", |ctx: ContextData<LedgerContext>| async move {
    HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
    ctx.update(|data| {
      data.total_cents -= 300;
      data.trail.push("discount".to_string());
    });
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  p.insert_before_step("subtotal", "open", true, None);
  p.remove_step("tax").expect("tax step exists");

  assert_eq!(p.step_names(), vec!["open", "subtotal", "shipping", "discount"]);
  assert_eq!(p.handler_count("discount"), 1);
  assert_eq!(p.handler_count("tax"), 0);

  let ctx = ContextData::new(LedgerContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().total_cents, 2200);
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn add_handler_with_explicit_phase() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new("explicit", &[("only", false, None)]);
  p.add_handler(Phase::After, "only", posting_handler("after", 5));
  p.add_handler(Phase::On, "only", posting_handler("on", 7));

  let ctx = ContextData::new(LedgerContext::default());
  assert_eq!(p.run(ctx.clone()).await, Ok(PipelineResult::Completed));
  assert_eq!(ctx.read().trail, vec!["on", "after"]);
}

#[test]
#[should_panic(expected = "step 'missing' not found")]
fn registering_against_unknown_step_panics() {
  let mut p = Pipeline::<LedgerContext, TestError>::new("wiring", &[("known", false, None)]);
  p.on("missing", posting_handler("missing", 0));
}
