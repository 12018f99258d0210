use crate::{events::EventEmitter, BlockError, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Identity of a block within one workflow run
pub type BlockId = u64;

/// Core trait that every block type implements
#[async_trait]
pub trait Block: Send + Sync {
    /// Type identifier (e.g., "math.increment", "transform.json_parse")
    fn block_type(&self) -> &str;

    /// The single compute entry point: properties and gathered inputs in,
    /// declared outputs out.
    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError>;
}

/// Everything a block sees while computing
#[derive(Clone)]
pub struct BlockContext {
    pub block_id: BlockId,
    pub block_type: String,

    /// Coerced property values
    pub properties: HashMap<String, Value>,

    /// Inputs gathered from predecessors; list ports hold a `Value::Array`
    pub inputs: HashMap<String, Value>,

    /// Event emitter for real-time updates
    pub events: EventEmitter,

    /// Cancelled when the run is aborted
    pub cancellation: CancellationToken,
}

impl BlockContext {
    pub fn new(block_id: BlockId, block_type: impl Into<String>, events: EventEmitter) -> Self {
        Self {
            block_id,
            block_type: block_type.into(),
            properties: HashMap::new(),
            inputs: HashMap::new(),
            events,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_properties(mut self, properties: HashMap<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, BlockError> {
        self.inputs
            .get(name)
            .ok_or_else(|| BlockError::MissingInput(name.to_string()))
    }

    /// Get property value or return error
    pub fn require_property(&self, name: &str) -> Result<&Value, BlockError> {
        self.properties
            .get(name)
            .ok_or_else(|| BlockError::Configuration(format!("Missing property: {}", name)))
    }

    /// Get property with default
    pub fn property_or(&self, name: &str, default: Value) -> Value {
        self.properties.get(name).cloned().unwrap_or(default)
    }

    pub fn input_i64(&self, name: &str) -> Result<i64, BlockError> {
        let value = self.require_input(name)?;
        value
            .as_i64()
            .ok_or_else(|| BlockError::invalid_type(name, "integer", value.type_name()))
    }

    pub fn property_i64(&self, name: &str) -> Result<i64, BlockError> {
        let value = self.require_property(name)?;
        value.as_i64().ok_or_else(|| {
            BlockError::Configuration(format!(
                "Property '{}' must be an integer, got {}",
                name,
                value.type_name()
            ))
        })
    }

    /// Read a list-cardinality input
    pub fn input_list(&self, name: &str) -> Result<&[Value], BlockError> {
        let value = self.require_input(name)?;
        value
            .as_array()
            .ok_or_else(|| BlockError::invalid_type(name, "array", value.type_name()))
    }
}

/// Output from block execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockOutput {
    /// Output port values
    pub outputs: HashMap<String, Value>,

    /// Opaque value returned by the compute step
    pub result: Value,

    pub metadata: BlockMetadata,
}

impl BlockOutput {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            result: Value::Null,
            metadata: BlockMetadata::default(),
        }
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<Value>) -> Self {
        self.result = result.into();
        self
    }
}

impl Default for BlockOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata about block execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub execution_time_ms: u64,
}
