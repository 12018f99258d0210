use crate::MODULE;
use async_trait::async_trait;
use blockcore::{
    Block, BlockContext, BlockError, BlockOutput, BlockSchema, Cardinality, Value, ValueType,
};
use blockruntime::BlockFactory;

/// Logs its input and passes it through
pub struct LogBlock;

#[async_trait]
impl Block for LogBlock {
    fn block_type(&self) -> &str {
        "debug.log"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let label = ctx
            .properties
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or("debug");

        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);

        tracing::info!("[{}] block {}: {:?}", label, ctx.block_id, value);
        ctx.events.info(format!("{}: {:?}", label, value));
        ctx.events.data("value", value.clone());

        Ok(BlockOutput::new().with_output("value", value))
    }
}

pub struct LogBlockFactory;

impl BlockFactory for LogBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("debug.log")
            .family("Debug")
            .module(MODULE)
            .description("Log a value and pass it on")
            .property("label", ValueType::String, Some("debug"))
            .input("value", ValueType::Any, Cardinality::Single)
            .output("value", ValueType::Any)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(LogBlock)
    }
}

/// Always fails; for exercising failure handling
pub struct FailBlock;

#[async_trait]
impl Block for FailBlock {
    fn block_type(&self) -> &str {
        "debug.fail"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let message = ctx
            .properties
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("failure requested");

        ctx.events.warn(format!("Failing on purpose: {}", message));
        Err(BlockError::compute(message))
    }
}

pub struct FailBlockFactory;

impl BlockFactory for FailBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("debug.fail")
            .family("Debug")
            .module(MODULE)
            .description("Fail with a configured message")
            .property("message", ValueType::String, Some("failure requested"))
            .input("value", ValueType::Any, Cardinality::Single)
            .output("value", ValueType::Any)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(FailBlock)
    }
}
