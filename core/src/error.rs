// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No flow registered for route '{route}'")]
  RouteNotFound { route: String },

  #[error("Context type mismatch for route '{route}' (expected {expected_type})")]
  ContextMismatch { route: String, expected_type: String },

  #[error("Error in step handler. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    // Unwrap a FlowError that was smuggled through anyhow instead of nesting it.
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(source) => FlowError::HandlerError { source },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
