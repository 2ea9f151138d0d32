// src/core/control.rs

/// What a handler asks the pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt immediately. Remaining handlers of this step and all later steps are not run.
  Stop,
}

/// Outcome of a pipeline run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  /// A handler returned [`PipelineControl::Stop`].
  Stopped,
}
