// tests/error_handling_tests.rs
mod common;

use checkout_flow::{ContextData, FlowError, Pipeline, PipelineControl};
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn handler_error_aborts_the_run() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new(
    "capture",
    &[("reserve", false, None), ("capture", false, None), ("finalize", false, None)],
  );
  p.on("reserve", posting_handler("reserve", 100));
  p.on("capture", failing_handler("capture", "proxy returned 500"));
  p.on("finalize", posting_handler("finalize", 1));

  let ctx = ContextData::new(LedgerContext::default());
  let result = p.run(ctx.clone()).await;

  assert_eq!(result, Err(TestError::Step("proxy returned 500".to_string())));
  assert_eq!(ctx.read().trail, vec!["reserve", "capture"]);
  assert_eq!(ctx.read().total_cents, 100);
}

#[tokio::test]
#[serial]
async fn required_step_without_handler_fails() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new("incomplete", &[("load", false, None), ("save", false, None)]);
  p.on("load", posting_handler("load", 0));

  let result = p.run(ContextData::new(LedgerContext::default())).await;
  match result {
    Err(TestError::Flow(msg)) => {
      assert!(msg.contains("HandlerMissing"));
      assert!(msg.contains("save"));
    }
    other => panic!("expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn handler_error_type_converts_into_pipeline_error() {
  setup_tracing();
  let mut p = Pipeline::<LedgerContext, TestError>::new("convert", &[("only", false, None)]);
  p.on("only", |_ctx: ContextData<LedgerContext>| async move {
    Err::<PipelineControl, FlowError>(FlowError::Internal("lost connection".to_string()))
  });

  match p.run(ContextData::new(LedgerContext::default())).await {
    Err(TestError::Flow(msg)) => assert!(msg.contains("lost connection")),
    other => panic!("expected converted flow error, got {:?}", other),
  }
}

#[test]
fn remove_unknown_step_reports_step_not_found() {
  let mut p = Pipeline::<LedgerContext, TestError>::new("remove", &[("a", false, None)]);
  match p.remove_step("b") {
    Err(FlowError::StepNotFound { step_name }) => assert_eq!(step_name, "b"),
    other => panic!("expected StepNotFound, got {:?}", other),
  }
}

#[test]
fn anyhow_wrapped_flow_error_is_unwrapped() {
  let wrapped = anyhow::Error::new(FlowError::RouteNotFound {
    route: "checkout".to_string(),
  });
  match FlowError::from(wrapped) {
    FlowError::RouteNotFound { route } => assert_eq!(route, "checkout"),
    other => panic!("expected RouteNotFound, got {:?}", other),
  }

  match FlowError::from(anyhow::anyhow!("socket closed")) {
    FlowError::HandlerError { source } => assert_eq!(source.to_string(), "socket closed"),
    other => panic!("expected HandlerError, got {:?}", other),
  }
}
