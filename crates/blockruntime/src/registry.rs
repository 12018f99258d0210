use blockcore::{Block, BlockSchema, CatalogEntry, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating block instances
pub trait BlockFactory: Send + Sync {
    /// Static schema of the block type. Called once, at registration.
    fn schema(&self) -> BlockSchema;

    /// Create a fresh block ready to compute
    fn create(&self) -> Box<dyn Block>;
}

struct Registered {
    schema: Arc<BlockSchema>,
    factory: Arc<dyn BlockFactory>,
}

/// Registry of available block types.
///
/// Populated by explicit registration; read-only once handed to a runtime,
/// so lookups need no synchronization.
pub struct BlockRegistry {
    blocks: HashMap<String, Registered>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
        }
    }

    /// Register a block factory, caching its schema
    pub fn register(&mut self, factory: Arc<dyn BlockFactory>) {
        let schema = Arc::new(factory.schema());
        let block_type = schema.type_name.clone();
        tracing::info!("Registering block type: {}", block_type);
        if self
            .blocks
            .insert(block_type.clone(), Registered { schema, factory })
            .is_some()
        {
            tracing::warn!("Block type {} registered twice, keeping the latest", block_type);
        }
    }

    /// Look up the schema of a block type
    pub fn resolve(&self, block_type: &str) -> Result<Arc<BlockSchema>, WorkflowError> {
        self.blocks
            .get(block_type)
            .map(|r| Arc::clone(&r.schema))
            .ok_or_else(|| WorkflowError::UnknownBlockType(block_type.to_string()))
    }

    /// Create a block instance for a block type
    pub fn create_block(&self, block_type: &str) -> Result<Box<dyn Block>, WorkflowError> {
        self.blocks
            .get(block_type)
            .map(|r| r.factory.create())
            .ok_or_else(|| WorkflowError::UnknownBlockType(block_type.to_string()))
    }

    /// Get all registered block types, sorted
    pub fn list_block_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.blocks.keys().cloned().collect();
        types.sort();
        types
    }

    /// Schemas of every block type a module declares
    pub fn module_blocks(&self, module: &str) -> Vec<Arc<BlockSchema>> {
        let mut schemas: Vec<Arc<BlockSchema>> = self
            .blocks
            .values()
            .filter(|r| r.schema.module == module)
            .map(|r| Arc::clone(&r.schema))
            .collect();
        schemas.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        schemas
    }

    /// Designer catalog, optionally restricted to one module
    pub fn catalog(&self, module: Option<&str>) -> Vec<CatalogEntry> {
        let schemas = match module {
            Some(module) => self.module_blocks(module),
            None => self
                .list_block_types()
                .iter()
                .filter_map(|t| self.resolve(t).ok())
                .collect(),
        };
        schemas.iter().map(|s| CatalogEntry::from(s.as_ref())).collect()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
