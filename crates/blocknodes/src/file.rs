use crate::MODULE;
use async_trait::async_trait;
use blockcore::{Block, BlockContext, BlockError, BlockOutput, BlockSchema, ValueType};
use blockruntime::BlockFactory;

/// Read a text file from the data root
pub struct ReadTextBlock;

#[async_trait]
impl Block for ReadTextBlock {
    fn block_type(&self) -> &str {
        "file.read_text"
    }

    async fn compute(&self, ctx: BlockContext) -> Result<BlockOutput, BlockError> {
        let property = ctx.require_property("path")?;
        let path = property.as_path().ok_or_else(|| {
            BlockError::Configuration(format!(
                "Property 'path' must be a file, got {}",
                property.type_name()
            ))
        })?;

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BlockError::compute(format!("reading {}: {}", path.display(), e)))?;

        ctx.events.info(format!("Read {} bytes from {}", text.len(), path.display()));

        Ok(BlockOutput::new()
            .with_output("lines", text.lines().count() as i64)
            .with_output("text", text))
    }
}

pub struct ReadTextBlockFactory;

impl BlockFactory for ReadTextBlockFactory {
    fn schema(&self) -> BlockSchema {
        BlockSchema::new("file.read_text")
            .family("File")
            .module(MODULE)
            .description("Read a text file relative to the data root")
            .property("path", ValueType::File, None)
            .output("text", ValueType::String)
            .output("lines", ValueType::Integer)
    }

    fn create(&self) -> Box<dyn Block> {
        Box::new(ReadTextBlock)
    }
}
