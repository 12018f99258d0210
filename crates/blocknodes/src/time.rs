use crate::MODULE;
use async_trait::async_trait;
use blockcore::{
    Block, BlockContext, BlockError, BlockOutput, BlockSchema, Cardinality, Value, ValueType,
};
use blockruntime::BlockFactory;
use tokio::time::{sleep, Duration};

/// Delay execution for a configured duration, then pass the input on
pub struct DelayBlock;

#[async_trait]
impl Block for DelayBlock {
    fn block_type(&self) -> &str {
        "time.delay"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let delay_ms = ctx.property_i64("delay_ms")?.max(0) as u64;

        ctx.events.info(format!("Delaying for {}ms", delay_ms));

        tokio::select! {
            _ = sleep(Duration::from_millis(delay_ms)) => {}
            _ = ctx.cancellation.cancelled() => return Err(BlockError::Cancelled),
        }

        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(BlockOutput::new().with_output("value", value))
    }
}

pub struct DelayBlockFactory;

impl BlockFactory for DelayBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("time.delay")
            .family("Time")
            .module(MODULE)
            .description("Delay execution for specified milliseconds")
            .property("delay_ms", ValueType::Integer, Some("1000"))
            .input("value", ValueType::Any, Cardinality::Single)
            .output("value", ValueType::Any)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(DelayBlock)
    }
}
