use crate::MODULE;
use async_trait::async_trait;
use blockcore::{
    Block, BlockContext, BlockError, BlockOutput, BlockSchema, Cardinality, Value, ValueType,
};
use blockruntime::BlockFactory;

/// Parse JSON string to Value
pub struct JsonParseBlock;

#[async_trait]
impl Block for JsonParseBlock {
    fn block_type(&self) -> &str {
        "transform.json_parse"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let input = ctx.require_input("json")?;
        let text = input
            .as_str()
            .ok_or_else(|| BlockError::invalid_type("json", "string", input.type_name()))?;

        let parsed: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| BlockError::compute(format!("JSON parse error: {}", e)))?;

        Ok(BlockOutput::new().with_output("parsed", Value::Json(parsed)))
    }
}

pub struct JsonParseBlockFactory;

impl BlockFactory for JsonParseBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("transform.json_parse")
            .family("Transform")
            .module(MODULE)
            .description("Parse JSON string")
            .input("json", ValueType::String, Cardinality::Single)
            .output("parsed", ValueType::Json)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(JsonParseBlock)
    }
}

/// Stringify Value to JSON
pub struct JsonStringifyBlock;

#[async_trait]
impl Block for JsonStringifyBlock {
    fn block_type(&self) -> &str {
        "transform.json_stringify"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.require_input("value")?;
        let pretty = ctx
            .property_or("pretty", Value::Bool(false))
            .as_bool()
            .unwrap_or(false);

        let json_str = match value {
            Value::Json(json) if pretty => serde_json::to_string_pretty(json),
            Value::Json(json) => serde_json::to_string(json),
            other if pretty => serde_json::to_string_pretty(other),
            other => serde_json::to_string(other),
        }
        .map_err(|e| BlockError::compute(format!("JSON stringify error: {}", e)))?;

        Ok(BlockOutput::new().with_output("json", json_str))
    }
}

pub struct JsonStringifyBlockFactory;

impl BlockFactory for JsonStringifyBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("transform.json_stringify")
            .family("Transform")
            .module(MODULE)
            .description("Convert value to JSON string")
            .property("pretty", ValueType::Bool, Some("false"))
            .input("value", ValueType::Any, Cardinality::Single)
            .output("json", ValueType::String)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(JsonStringifyBlock)
    }
}
