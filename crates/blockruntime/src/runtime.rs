use crate::engine::{ExecutionEngine, RunOutcome};
use crate::executor::{BlockExecutor, WorkerCommand};
use crate::graph::{GraphBuilder, WorkflowGraph};
use crate::registry::BlockRegistry;
use blockcore::{CatalogEntry, EventBus, FlowError, WorkflowDescription, WorkflowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main runtime for building and executing workflows
pub struct BlockRuntime {
    registry: Arc<BlockRegistry>,
    engine: ExecutionEngine,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
}

impl BlockRuntime {
    /// Create a new runtime with an empty registry
    pub fn new() -> Self {
        Self::with_registry(Arc::new(BlockRegistry::new()), RuntimeConfig::default())
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<BlockRegistry>, config: RuntimeConfig) -> Self {
        let mut executor = BlockExecutor::new(Arc::clone(&registry));
        if let Some(worker) = &config.worker {
            executor = executor.with_worker(
                worker.clone(),
                config.work_dir.clone(),
                Duration::from_secs(config.worker_timeout_secs),
            );
        }

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let engine = ExecutionEngine::new(Arc::new(executor), Arc::clone(&event_bus))
            .cancel_on_failure(config.cancel_on_failure);

        Self {
            registry,
            engine,
            event_bus,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Build the graph for a workflow without running it
    pub fn build(&self, workflow: &WorkflowDescription) -> Result<WorkflowGraph, WorkflowError> {
        GraphBuilder::new(&self.registry)
            .data_root(self.config.data_root.clone())
            .detect_cycles(self.config.detect_cycles)
            .build(workflow)
    }

    /// Build and execute a workflow. Build errors abort before any block runs.
    pub async fn execute(&self, workflow: &WorkflowDescription) -> Result<RunOutcome, FlowError> {
        let graph = self.build(workflow)?;
        Ok(self.engine.execute(graph).await)
    }

    pub fn catalog(&self, module: Option<&str>) -> Vec<CatalogEntry> {
        self.registry.catalog(module)
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<blockcore::ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for BlockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Root that `file` properties are resolved against
    pub data_root: PathBuf,
    /// Where request/response files for external workers are written
    pub work_dir: PathBuf,
    /// Worker process for external blocks; without one they run in-process
    pub worker: Option<WorkerCommand>,
    pub worker_timeout_secs: u64,
    pub detect_cycles: bool,
    pub cancel_on_failure: bool,
    pub event_buffer_size: usize,
}

impl RuntimeConfig {
    /// Load a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, FlowError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            work_dir: std::env::temp_dir().join("blockflow"),
            worker: None,
            worker_timeout_secs: 300,
            detect_cycles: true,
            cancel_on_failure: false,
            event_buffer_size: 1000,
        }
    }
}
