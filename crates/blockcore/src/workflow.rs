use crate::BlockId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declarative workflow: blocks plus the data edges between them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub blocks: Vec<BlockDescription>,
    #[serde(default)]
    pub edges: Vec<EdgeDescription>,
}

impl WorkflowDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_block(&mut self, block: BlockDescription) -> BlockId {
        let id = block.id;
        self.blocks.push(block);
        id
    }

    pub fn connect(
        &mut self,
        source_block_id: BlockId,
        source_output_port: impl Into<String>,
        dest_block_id: BlockId,
        dest_input_port: impl Into<String>,
    ) {
        self.edges.push(EdgeDescription {
            source_block_id,
            source_output_port: source_output_port.into(),
            dest_block_id,
            dest_input_port: dest_input_port.into(),
        });
    }

    pub fn find_block(&self, id: BlockId) -> Option<&BlockDescription> {
        self.blocks.iter().find(|b| b.id == id)
    }
}

/// One block of a workflow description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDescription {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub module: String,
    /// Raw property values as sent by the designer, coerced at build time
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
}

impl BlockDescription {
    pub fn new(id: BlockId, block_type: impl Into<String>) -> Self {
        Self {
            id,
            block_type: block_type.into(),
            module: String::new(),
            values: HashMap::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Data edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDescription {
    pub source_block_id: BlockId,
    pub source_output_port: String,
    pub dest_block_id: BlockId,
    pub dest_input_port: String,
}
