//! Payloads exchanged with an external worker process

use crate::{BlockOutput, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalExecutionRequest {
    pub block_type: String,
    #[serde(default)]
    pub module: String,
    pub properties: HashMap<String, Value>,
    pub inputs: HashMap<String, Value>,
}

/// The request echoed back with the computed outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalExecutionResponse {
    pub block_type: String,
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    #[serde(default)]
    pub outputs: HashMap<String, Value>,
    #[serde(default = "null_result")]
    pub computed_result: Value,
}

fn null_result() -> Value {
    Value::Null
}

impl ExternalExecutionResponse {
    pub fn from_request(request: ExternalExecutionRequest, output: BlockOutput) -> Self {
        Self {
            block_type: request.block_type,
            module: request.module,
            properties: request.properties,
            inputs: request.inputs,
            outputs: output.outputs,
            computed_result: output.result,
        }
    }
}
