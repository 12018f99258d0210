// Shared blocks and helpers for the runtime integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use blockcore::{
    Block, BlockContext, BlockDescription, BlockError, BlockOutput, BlockSchema, Cardinality,
    Value, ValueType, WorkflowDescription,
};
use blockruntime::{BlockFactory, BlockRegistry, BlockRuntime, RuntimeConfig};
use std::sync::Arc;
use std::time::Duration;

/// Factory pairing a fixed schema with a constructor
pub struct TestFactory {
    schema: BlockSchema,
    make: fn() -> Box<dyn Block>,
}

impl BlockFactory for TestFactory {
    fn schema(&self) -> BlockSchema {
        self.schema.clone()
    }

    fn create(&self) -> Box<dyn Block> {
        (self.make)()
    }
}

fn factory(schema: BlockSchema, make: fn() -> Box<dyn Block>) -> Arc<dyn BlockFactory> {
    Arc::new(TestFactory { schema, make })
}

/// Emits its `value` property
pub struct SourceBlock;

#[async_trait]
impl Block for SourceBlock {
    fn block_type(&self) -> &str {
        "test.source"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.property_i64("value")?;
        Ok(BlockOutput::new().with_output("value", value).with_result(value))
    }
}

/// Adds `step` to its input
pub struct IncrementBlock;

#[async_trait]
impl Block for IncrementBlock {
    fn block_type(&self) -> &str {
        "test.increment"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.input_i64("value")? + ctx.property_i64("step")?;
        Ok(BlockOutput::new().with_output("value", value).with_result(value))
    }
}

/// Sums a list input
pub struct SumBlock;

#[async_trait]
impl Block for SumBlock {
    fn block_type(&self) -> &str {
        "test.sum"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let mut sum = 0;
        for value in ctx.input_list("values")? {
            sum += value
                .as_i64()
                .ok_or_else(|| BlockError::invalid_type("values", "integer", value.type_name()))?;
        }
        Ok(BlockOutput::new().with_output("sum", sum))
    }
}

/// Passes its list input through unchanged
pub struct CollectBlock;

#[async_trait]
impl Block for CollectBlock {
    fn block_type(&self) -> &str {
        "test.collect"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let values = ctx.input_list("values")?.to_vec();
        Ok(BlockOutput::new().with_output("values", Value::Array(values)))
    }
}

pub struct FailBlock;

#[async_trait]
impl Block for FailBlock {
    fn block_type(&self) -> &str {
        "test.fail"
    }

    async fn compute(&self, _ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        Err(BlockError::compute("boom"))
    }
}

pub struct PanicBlock;

#[async_trait]
impl Block for PanicBlock {
    fn block_type(&self) -> &str {
        "test.panic"
    }

    async fn compute(&self, _ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        panic!("block panicked");
    }
}

/// Sleeps `delay_ms`, then passes its input on
pub struct DelayBlock;

#[async_trait]
impl Block for DelayBlock {
    fn block_type(&self) -> &str {
        "test.delay"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let delay = Duration::from_millis(ctx.property_i64("delay_ms")?.max(0) as u64);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = ctx.cancellation.cancelled() => return Err(BlockError::Cancelled),
        }
        let value = ctx.inputs.get("value").cloned().unwrap_or(Value::Null);
        Ok(BlockOutput::new().with_output("value", value))
    }
}

/// Reports the resolved path of its `path` property
pub struct PathBlock;

#[async_trait]
impl Block for PathBlock {
    fn block_type(&self) -> &str {
        "test.path"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let path = ctx.require_property("path")?.clone();
        Ok(BlockOutput::new().with_output("path", path))
    }
}

/// Doubles its input; asks for a worker process
pub struct ExternalDoubleBlock;

#[async_trait]
impl Block for ExternalDoubleBlock {
    fn block_type(&self) -> &str {
        "test.external_double"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.input_i64("value")? * 2;
        Ok(BlockOutput::new().with_output("value", value).with_result(value))
    }
}

pub fn test_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();

    registry.register(factory(
        BlockSchema::new("test.source")
            .module("test")
            .property("value", ValueType::Integer, Some("0"))
            .output("value", ValueType::Integer),
        || Box::new(SourceBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.increment")
            .module("test")
            .property("step", ValueType::Integer, Some("1"))
            .input("value", ValueType::Integer, Cardinality::Single)
            .output("value", ValueType::Integer),
        || Box::new(IncrementBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.sum")
            .module("test")
            .input("values", ValueType::Integer, Cardinality::List)
            .output("sum", ValueType::Integer),
        || Box::new(SumBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.collect")
            .module("test")
            .input("values", ValueType::Any, Cardinality::List)
            .output("values", ValueType::Any),
        || Box::new(CollectBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.fail")
            .module("test")
            .input("value", ValueType::Any, Cardinality::Single)
            .output("value", ValueType::Any),
        || Box::new(FailBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.panic")
            .module("test")
            .output("value", ValueType::Any),
        || Box::new(PanicBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.delay")
            .module("test")
            .property("delay_ms", ValueType::Integer, Some("50"))
            .input("value", ValueType::Any, Cardinality::Single)
            .output("value", ValueType::Any),
        || Box::new(DelayBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.path")
            .module("test")
            .property("path", ValueType::File, None)
            .output("path", ValueType::File),
        || Box::new(PathBlock),
    ));
    registry.register(factory(
        BlockSchema::new("test.external_double")
            .module("test")
            .external(true)
            .input("value", ValueType::Integer, Cardinality::Single)
            .output("value", ValueType::Integer),
        || Box::new(ExternalDoubleBlock),
    ));

    registry
}

pub fn runtime() -> BlockRuntime {
    runtime_with(RuntimeConfig::default())
}

pub fn runtime_with(config: RuntimeConfig) -> BlockRuntime {
    BlockRuntime::with_registry(Arc::new(test_registry()), config)
}

pub fn source(id: u64, value: i64) -> BlockDescription {
    BlockDescription::new(id, "test.source").with_value("value", value)
}

/// `source(value) -> increment -> increment`, ids 1..=3
pub fn chain_workflow(value: i64) -> WorkflowDescription {
    let mut workflow = WorkflowDescription::new("chain");
    workflow.add_block(source(1, value));
    workflow.add_block(BlockDescription::new(2, "test.increment"));
    workflow.add_block(BlockDescription::new(3, "test.increment"));
    workflow.connect(1, "value", 2, "value");
    workflow.connect(2, "value", 3, "value");
    workflow
}
