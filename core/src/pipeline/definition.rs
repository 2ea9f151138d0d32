// src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural editing methods.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;

/// An ordered list of named steps plus the handlers attached to them.
///
/// `Err` is the error type every handler resolves to. It must absorb
/// [`FlowError`] so that misconfiguration found at run time (a required step
/// with no handler) surfaces through the same channel.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional, skip_if)` tuples, run in order.
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, optional, skip_if)| StepDef::new(*step_name, *optional, skip_if.clone()))
      .collect();

    Self {
      name: name.into(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn position(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Panics when the step is unknown. Registration against a missing step is a
  /// wiring bug, not a runtime condition.
  pub(crate) fn step_index(&self, step_name: &str) -> usize {
    match self.position(step_name) {
      Some(idx) => idx,
      None => panic!("Flow setup error: step '{}' not found in pipeline '{}'.", step_name, self.name),
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.position(step_name).is_some() {
      panic!(
        "Flow setup error: step '{}' already exists in pipeline '{}'.",
        step_name, self.name
      );
    }
  }

  pub fn insert_before_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    let idx = self.step_index(existing_step_name);
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx, StepDef::new(name, optional, skip_if));
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    let idx = self.step_index(existing_step_name);
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef::new(name, optional, skip_if));
  }

  /// Removes a step together with every handler registered for it.
  pub fn remove_step(&mut self, step_name: &str) -> FlowResult<()> {
    let idx = self.position(step_name).ok_or_else(|| FlowError::StepNotFound {
      step_name: step_name.to_string(),
    })?;
    self.steps.remove(idx);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
    Ok(())
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) {
    let idx = self.step_index(step_name);
    self.steps[idx].optional = optional;
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let idx = self.step_index(step_name);
    self.steps[idx].skip_if = skip_if;
  }
}

impl<TData, Err> std::fmt::Debug for Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .finish_non_exhaustive()
  }
}
