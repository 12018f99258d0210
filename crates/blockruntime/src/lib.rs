//! Workflow execution runtime
//!
//! This crate provides the block registry, the graph builder, and the
//! engine that runs a block graph concurrently, in-process or through an
//! external worker process.

mod context;
mod engine;
mod executor;
mod graph;
mod registry;
mod report;
mod runtime;
pub mod worker;

pub use context::RunContext;
pub use engine::{ExecutionEngine, RunOutcome};
pub use executor::{BlockExecutor, Execution, WorkerCommand};
pub use graph::{BlockInstance, BlockState, GraphBuilder, InputSource, WorkflowGraph};
pub use registry::{BlockFactory, BlockRegistry};
pub use report::{BlockReport, RunReport, RunStatus};
pub use runtime::{BlockRuntime, RuntimeConfig};
pub use worker::run_worker;
