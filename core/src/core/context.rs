// src/core/context.rs

//! Handler signature shared by every phase of a step.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by a registered handler.
pub type HandlerFuture<Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>;

/// A step handler.
///
/// It receives a clone of the flow's `ContextData<TData>`, does its work and
/// tells the pipeline whether to continue. Lock guards taken on the context
/// must be released before the handler awaits anything.
pub type Handler<TData, Err> = Box<dyn Fn(ContextData<TData>) -> HandlerFuture<Err> + Send + Sync>;
