//! Standard block library
//!
//! Collection of built-in blocks, registered explicitly with a registry

mod arithmetic;
mod debug;
mod file;
mod time;
mod transform;

pub use arithmetic::{ConstantBlock, IncrementBlock, MultiplyBlock, SumBlock};
pub use debug::{FailBlock, LogBlock};
pub use file::ReadTextBlock;
pub use time::DelayBlock;
pub use transform::{JsonParseBlock, JsonStringifyBlock};

use blockruntime::BlockRegistry;
use std::sync::Arc;

/// Module every standard block declares
pub const MODULE: &str = "standard";

/// Register all standard blocks with a registry
pub fn register_all(registry: &mut BlockRegistry) {
    registry.register(Arc::new(arithmetic::ConstantBlockFactory));
    registry.register(Arc::new(arithmetic::IncrementBlockFactory));
    registry.register(Arc::new(arithmetic::SumBlockFactory));
    registry.register(Arc::new(arithmetic::MultiplyBlockFactory));
    registry.register(Arc::new(debug::LogBlockFactory));
    registry.register(Arc::new(debug::FailBlockFactory));
    registry.register(Arc::new(file::ReadTextBlockFactory));
    registry.register(Arc::new(time::DelayBlockFactory));
    registry.register(Arc::new(transform::JsonParseBlockFactory));
    registry.register(Arc::new(transform::JsonStringifyBlockFactory));
}

/// A registry holding every standard block
pub fn standard_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();
    register_all(&mut registry);
    registry
}
