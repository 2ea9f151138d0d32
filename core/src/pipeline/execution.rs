// src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives each phase's handlers.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::hooks::Phase;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes every step against `ctx_data`.
  ///
  /// The first handler error aborts the run and is returned as is. A required
  /// step without any handler fails with [`FlowError::HandlerMissing`].
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline = %self.name,
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "flow_step",
        step_name = step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      let skip = {
        let guard = ctx_data.read();
        step_def.should_skip(&guard)
      };
      if skip {
        event!(parent: &step_span, Level::INFO, "Step skipped by its skip condition.");
        continue;
      }

      if self.handler_count(step_name) == 0 {
        if step_def.optional {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for phase in Phase::ALL {
        let control = self
          .run_phase(phase, step_name, &ctx_data)
          .instrument(step_span.clone())
          .await?;
        if control == PipelineControl::Stop {
          return Ok(PipelineResult::Stopped);
        }
      }
      event!(parent: &step_span, Level::DEBUG, "Step finished.");
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_phase(&self, phase: Phase, step_name: &str, ctx_data: &ContextData<TData>) -> Result<PipelineControl, Err> {
    let Some(handlers) = self.handlers(phase).get(step_name) else {
      return Ok(PipelineControl::Continue);
    };

    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      match handler_fn(ctx_data.clone()).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, %phase, handler_index = handler_idx, "Pipeline stopped by handler.");
          return Ok(PipelineControl::Stop);
        }
        Err(e) => {
          event!(Level::ERROR, %phase, handler_index = handler_idx, error = %e, "Handler failed.");
          return Err(e);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }
}
