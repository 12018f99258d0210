use crate::BlockId;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while a single block runs. They fail only that block.
#[derive(Error, Debug, Clone)]
pub enum BlockError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Block {block_id} never produced output '{port}'")]
    MissingSourceOutput { block_id: BlockId, port: String },

    #[error("Compute failed: {0}")]
    ComputeFailed(String),

    #[error("External worker failed ({reason})")]
    ExternalWorker {
        reason: WorkerFailure,
        stdout: String,
        stderr: String,
    },

    #[error("Cancelled")]
    Cancelled,
}

impl BlockError {
    pub fn compute(message: impl Into<String>) -> Self {
        BlockError::ComputeFailed(message.into())
    }

    pub fn invalid_type(field: &str, expected: &str, actual: &str) -> Self {
        BlockError::InvalidInputType {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Why an external worker invocation did not yield outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    Spawn(String),
    Exit(Option<i32>),
    MissingResponse,
    Decode(String),
    Io(String),
    Timeout { seconds: u64 },
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "failed to spawn worker: {}", msg),
            Self::Exit(Some(code)) => write!(f, "worker exited with code {}", code),
            Self::Exit(None) => write!(f, "worker terminated by signal"),
            Self::MissingResponse => write!(f, "worker wrote no response"),
            Self::Decode(msg) => write!(f, "unreadable response: {}", msg),
            Self::Io(msg) => write!(f, "request/response io: {}", msg),
            Self::Timeout { seconds } => write!(f, "timeout after {}s", seconds),
        }
    }
}

/// Errors found while turning a description into a graph. Nothing runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("Unresolved input source for block {block_id}, port '{port}'")]
    UnresolvedInputSource { block_id: BlockId, port: String },

    #[error("Input '{port}' of block {block_id} accepts a single value but is bound more than once")]
    PortCardinalityViolation { block_id: BlockId, port: String },

    #[error("Property '{property}' of block {block_id}: expected {expected}, got {actual}")]
    PropertyTypeMismatch {
        block_id: BlockId,
        property: String,
        expected: String,
        actual: String,
    },

    #[error("Duplicate block id: {0}")]
    DuplicateBlockId(BlockId),

    #[error("Cyclic dependency detected")]
    CyclicDependency,
}
