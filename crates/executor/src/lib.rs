//! Contract operation dispatcher and bounded-execution sandbox.
//!
//! This crate sits between a chain's transaction executor and an embedded
//! scripting engine. It owns the control and error boundary around the
//! engine: per-operation dispatch, isolated single-use execution scopes
//! with an instruction budget, classification of engine outcomes into the
//! chain's error model, and delivery of typed task results.
//!
//! The engine itself (parser, interpreter, GC) is external; it is consumed
//! through the narrow [`engine::Engine`] / [`engine::EngineProvider`] seam.

pub mod config;
pub mod engine;
pub mod executor;
pub mod service;
pub mod types;

pub use config::ExecutionConfig;
pub use executor::{Dispatcher, ExecutionContext, ExecutionError, ExecutionScope, Outcome};
pub use service::{spawn_service, ResultCallback, TaskAndCallback};
pub use types::{
    ContractOperation, StateCheckpoint, Task, TaskId, TaskKind, TaskResult, TaskResultPayload,
    TaskSource, WireMessage,
};
