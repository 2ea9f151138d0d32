// src/lib.rs

//! Asynchronous step pipelines for request-scoped checkout flows.
//!
//! A flow is a [`Pipeline`] of named steps. Each step may carry `before`, `on`
//! and `after` handlers that operate on a shared [`ContextData`]. Handlers can
//! stop the flow early, a step can be optional or skipped by a predicate, and
//! the [`Flows`] registry dispatches a pipeline by the name of the request
//! route it serves.
//!
//! ```text
//! let mut p = Pipeline::<MyCtx, MyErr>::new("create", &[("load", false, None)]);
//! p.on("load", load_step);
//! flows.register("create_order", p);
//! flows.run("create_order", ContextData::new(ctx)).await?;
//! ```

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::{Handler, HandlerFuture};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::hooks::Phase;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flows;
