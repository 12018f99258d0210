use crate::MODULE;
use async_trait::async_trait;
use blockcore::{
    Block, BlockContext, BlockError, BlockOutput, BlockSchema, Cardinality, Value, ValueType,
};
use blockruntime::BlockFactory;

/// Emit a configured integer
pub struct ConstantBlock;

#[async_trait]
impl Block for ConstantBlock {
    fn block_type(&self) -> &str {
        "math.constant"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.property_i64("value")?;
        Ok(BlockOutput::new()
            .with_output("value", value)
            .with_result(value))
    }
}

pub struct ConstantBlockFactory;

impl BlockFactory for ConstantBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("math.constant")
            .family("Arithmetic")
            .module(MODULE)
            .description("Emit a constant integer")
            .property("value", ValueType::Integer, Some("0"))
            .output("value", ValueType::Integer)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(ConstantBlock)
    }
}

/// Add `step` to an integer
pub struct IncrementBlock;

#[async_trait]
impl Block for IncrementBlock {
    fn block_type(&self) -> &str {
        "math.increment"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.input_i64("value")?;
        let step = ctx.property_i64("step")?;
        let sum = value
            .checked_add(step)
            .ok_or_else(|| BlockError::compute(format!("{} + {} overflows", value, step)))?;

        Ok(BlockOutput::new().with_output("value", sum).with_result(sum))
    }
}

pub struct IncrementBlockFactory;

impl BlockFactory for IncrementBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("math.increment")
            .family("Arithmetic")
            .module(MODULE)
            .description("Add a step to an integer")
            .property("step", ValueType::Integer, Some("1"))
            .input("value", ValueType::Integer, Cardinality::Single)
            .output("value", ValueType::Integer)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(IncrementBlock)
    }
}

/// Sum a list of numbers
pub struct SumBlock;

#[async_trait]
impl Block for SumBlock {
    fn block_type(&self) -> &str {
        "math.sum"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let values = ctx.input_list("values")?;

        // Stay integral while every operand is.
        if let Some(ints) = values.iter().map(Value::as_i64).collect::<Option<Vec<_>>>() {
            let sum = ints
                .iter()
                .try_fold(0i64, |acc, n| acc.checked_add(*n))
                .ok_or_else(|| BlockError::compute(format!("sum of {} integers overflows", ints.len())))?;
            return Ok(BlockOutput::new()
                .with_output("sum", sum)
                .with_output("count", values.len() as i64)
                .with_result(sum));
        }

        let mut sum = 0.0;
        for (i, value) in values.iter().enumerate() {
            sum += value.as_f64().ok_or_else(|| {
                BlockError::invalid_type(&format!("values[{}]", i), "number", value.type_name())
            })?;
        }

        Ok(BlockOutput::new()
            .with_output("sum", sum)
            .with_output("count", values.len() as i64)
            .with_result(sum))
    }
}

pub struct SumBlockFactory;

impl BlockFactory for SumBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("math.sum")
            .family("Arithmetic")
            .module(MODULE)
            .description("Sum every connected number")
            .input("values", ValueType::Number, Cardinality::List)
            .output("sum", ValueType::Number)
            .output("count", ValueType::Integer)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(SumBlock)
    }
}

/// Multiply by a factor. Runs in a worker process when one is configured.
pub struct MultiplyBlock;

#[async_trait]
impl Block for MultiplyBlock {
    fn block_type(&self) -> &str {
        "math.multiply"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let value = ctx.input_i64("value")?;
        let factor = ctx.property_i64("factor")?;
        let product = value
            .checked_mul(factor)
            .ok_or_else(|| BlockError::compute(format!("{} * {} overflows", value, factor)))?;

        ctx.events.info(format!("{} * {} = {}", value, factor, product));

        Ok(BlockOutput::new()
            .with_output("value", product)
            .with_result(product))
    }
}

pub struct MultiplyBlockFactory;

impl BlockFactory for MultiplyBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("math.multiply")
            .family("Arithmetic")
            .module(MODULE)
            .description("Multiply an integer by a factor, out of process")
            .external(true)
            .property("factor", ValueType::Integer, Some("2"))
            .input("value", ValueType::Integer, Cardinality::Single)
            .output("value", ValueType::Integer)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(MultiplyBlock)
    }
}
