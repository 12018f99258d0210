//! Core abstractions for the block workflow engine
//!
//! This crate provides the fundamental types and traits that all other
//! components depend on: values, block schemas, the block trait, workflow
//! descriptions and the payloads exchanged with external workers.

mod block;
pub mod catalog;
mod error;
pub mod events;
pub mod protocol;
mod schema;
mod value;
mod workflow;

pub use block::{Block, BlockContext, BlockId, BlockMetadata, BlockOutput};
pub use catalog::{CatalogEntry, CatalogField, FieldRole};
pub use error::{BlockError, FlowError, WorkerFailure, WorkflowError};
pub use events::*;
pub use protocol::{ExternalExecutionRequest, ExternalExecutionResponse};
pub use schema::{BlockSchema, Cardinality, PortSpec, PropertySpec};
pub use value::{Value, ValueType};
pub use workflow::{BlockDescription, EdgeDescription, WorkflowDescription};

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
